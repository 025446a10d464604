//! The middleware module (C5) and the request connector state machine (C6).
//!
//! `AuthMiddleware` is constructed once per server (§4.5) and exposed to an `axum::Router` as a
//! pair of `tower` layers, the way the rest of the corpus wires `tower_http` layers onto a
//! `Router` (see the teacher crate's `http::mod::api_router`). The home connector and the authn
//! connector are separate `axum::middleware::from_fn_with_state` layers, composed so the home
//! connector runs first, exactly as SPEC_FULL.md §5 orders them.

mod extract;
mod home;
mod state_machine;

pub use extract::{CurrentUser, MaybeCurrentUser};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::authn::{self, AuthnDriver};
use crate::authz::{self, AuthzBackend};
use crate::config::Config;
use crate::error::Result;
use crate::hash;
use crate::session::ClientCtx;

/// How long an idle connection's [`ClientCtx`] is kept around before being reaped. Stands in
/// for the reference implementation's exact-disconnect teardown (§5 "Cancellation"), which an
/// async server keyed by peer address can only approximate - see SPEC_FULL.md's discussion of
/// per-connection state under the async runtime.
const CLIENT_CTX_TTL: Duration = Duration::from_secs(600);

#[derive(Default)]
struct ClientRegistry {
    clients: Mutex<HashMap<SocketAddr, (ClientCtx, Instant)>>,
}

impl ClientRegistry {
    fn get_or_create(&self, addr: SocketAddr) -> ClientCtx {
        let mut clients = self.clients.lock().unwrap();
        clients.retain(|_, (_, last_seen)| last_seen.elapsed() < CLIENT_CTX_TTL);
        let entry = clients
            .entry(addr)
            .or_insert_with(|| (ClientCtx::new(), Instant::now()));
        entry.1 = Instant::now();
        entry.0.clone()
    }
}

/// Shared, `Clone`-able middleware state: the wired authn driver, authz backend, and resolved
/// config (C5). Implements axum's `State` extraction requirement (`Clone + Send + Sync`).
#[derive(Clone)]
pub struct AuthMiddleware {
    pub(crate) config: Arc<Config>,
    pub(crate) authz: Arc<dyn AuthzBackend>,
    pub(crate) authn: Arc<dyn AuthnDriver>,
    registry: Arc<ClientRegistry>,
}

impl AuthMiddleware {
    /// Wire authz, hash, and authn per the construction sequence in SPEC_FULL.md §4.5,
    /// clearing `token` (`TOKEN_E`) when neither `join` nor a JWT path is available
    /// (invariant I3).
    pub fn new(mut config: Config) -> Result<Self> {
        let authz = authz::build(&config)?;

        if config.token && !authz.supports_join() && !authz.supports_check() {
            log::warn!(
                "authz backend for {:?} supports neither `join` nor token `check`; clearing the token flag",
                config.authz_type
            );
            config.token = false;
        }

        let resolved_hash = hash::resolve(config.algo.as_deref());
        let authn = authn::build(&config, resolved_hash);

        if config.unix && !config.exclusive_server {
            return Err(crate::error::Error::ExclusiveServerRequired);
        }

        if config.protect.is_empty() {
            config.protect = "*".to_string();
        }

        Ok(Self {
            config: Arc::new(config),
            authz: Arc::from(authz),
            authn: Arc::from(authn),
            registry: Arc::default(),
        })
    }

    fn client_ctx(&self, addr: SocketAddr) -> ClientCtx {
        self.registry.get_or_create(addr)
    }

    /// Layer an axum `Router` with the home connector (if `HOME_E`/`home` is set) and the authn
    /// connector, in that order (outermost to innermost matches execution order: home runs
    /// before authn, per §5).
    pub fn layer(self, router: Router) -> Router {
        if self.config.home {
            router
                .layer(from_fn_with_state(
                    self.clone(),
                    state_machine::authn_connector,
                ))
                .layer(from_fn_with_state(self, home::home_connector))
        } else {
            router.layer(from_fn_with_state(self, state_machine::authn_connector))
        }
    }
}

#[cfg(test)]
mod tests;
