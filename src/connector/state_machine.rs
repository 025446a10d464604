//! The authn connector (C6.2): the per-request state machine described in SPEC_FULL.md §4.6.2.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use percent_encoding::percent_decode_str;

use crate::authn::{Challenge, Verified};
use crate::authz::JwtBackend;
use crate::connector::AuthMiddleware;
use crate::session::AuthSession;
use crate::token;

const TOKEN_HEADER: &str = "x-auth-token";
const TOKEN_COOKIE: &str = "X-Auth-Token";
const AUTH_HEADER: &str = "authorization";

enum Credential {
    /// An `Authorization`-shaped credential whose scheme prefix matched; verified through
    /// `authn.check`.
    Scheme(String),
    /// A bare session token read from the `X-Auth-Token` channel; verified directly through
    /// `authz.check` (§4.4 "Input channels").
    Token(String),
}

pub async fn authn_connector(
    State(mw): State<AuthMiddleware>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = mw.client_ctx(addr);

    // S0: already authenticated on this connection (invariant I1) - don't reverify, just
    // re-attach identity to this request/response.
    if let Some(info) = ctx.info() {
        request.extensions_mut().insert(info.clone());
        let mut response = next.run(request).await;
        attach_identity(response.headers_mut(), &info, &mw);
        return response;
    }

    // S1: a bare `WWW-Authenticate` request header is a non-standard client self-logout
    // convention, preserved behind `allow_header_logout` (SPEC_FULL.md §9).
    if mw.config.allow_header_logout && request.headers().contains_key(header::WWW_AUTHENTICATE) {
        ctx.clear_info();
        return StatusCode::OK.into_response();
    }

    // S2: extract credential.
    let credential = extract_credential(request.headers(), &mw);

    // S3: verify.
    if let Some(credential) = credential {
        let verified = match credential {
            Credential::Scheme(payload) => {
                let method =
                    if mw.config.redirect.is_some() && mw.config.verify_any_method_under_redirect {
                        "HEAD"
                    } else {
                        request.method().as_str()
                    };
                mw.authn
                    .check(method, request.uri().path(), &payload, mw.authz.as_ref())
            }
            Credential::Token(token) => mw.authz.check(&token).map(|user| Verified { user }),
        };

        if let Some(verified) = verified {
            let session = build_session(&mw, verified);
            ctx.set_info(session.clone());
            request.extensions_mut().insert(session.clone());

            if mw.config.unix {
                impersonate(&session.user);
            }

            let mut response = next.run(request).await;
            attach_identity(response.headers_mut(), &session, &mw);
            return response;
        }
    }

    // S4: protection check.
    let decoded_path = percent_decode_str(request.uri().path())
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| request.uri().path().to_string());

    if !mw.config.is_protected(&decoded_path) {
        return next.run(request).await;
    }

    // S5: challenge.
    challenge_response(&mw, request, &decoded_path, next).await
}

fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

fn extract_credential(headers: &HeaderMap, mw: &AuthMiddleware) -> Option<Credential> {
    let scheme_name = mw.authn.scheme_name();

    let from_header = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_scheme(v, scheme_name));

    let from_cookie = || {
        CookieJar::from_headers(headers)
            .get("Authorization")
            .and_then(|c| parse_scheme(c.value(), scheme_name))
    };

    if let Some(payload) = from_header.or_else(from_cookie) {
        return Some(Credential::Scheme(payload));
    }

    if mw.config.token {
        if mw.config.header {
            if let Some(token) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
                return Some(Credential::Token(token.to_string()));
            }
        }
        if mw.config.cookie {
            if let Some(cookie) = CookieJar::from_headers(headers).get(TOKEN_COOKIE) {
                return Some(Credential::Token(cookie.value().to_string()));
            }
        }
    }

    None
}

/// Split `"<Scheme> <payload>"` and keep `payload` only if `<Scheme>` matches (case-insensitive)
/// the configured scheme name; a mismatch is logged and treated as no credential at all.
fn parse_scheme(value: &str, scheme_name: &str) -> Option<String> {
    let (scheme, payload) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case(scheme_name) {
        Some(payload.to_string())
    } else {
        log::debug!(
            "Authorization scheme {scheme:?} does not match configured scheme {scheme_name:?}"
        );
        None
    }
}

fn build_session(mw: &AuthMiddleware, verified: Verified) -> AuthSession {
    let account = mw.authz.account(&verified.user);
    let mut session = AuthSession::new(verified.user, mw.authn.scheme_name());
    session.group = account.group;
    session.home = account.home;

    if mw.config.token {
        let minted = mint_token(mw, &session);
        session.token = Some(minted);
    }

    session
}

fn mint_token(mw: &AuthMiddleware, session: &AuthSession) -> String {
    if let Some(jwt) = mw.authz.as_any().downcast_ref::<JwtBackend>() {
        match jwt.generate_token(
            &session.user,
            session.group.as_deref(),
            session.home.as_deref(),
            mw.config.expire,
        ) {
            Ok(token) => return token,
            Err(e) => log::warn!("failed to mint JWT session token: {e}"),
        }
    }

    let token = token::generate();
    if let Err(e) = mw.authz.join(&session.user, &token, mw.config.expire) {
        log::warn!(
            "failed to persist session token for user {:?}: {e}",
            session.user
        );
    }
    token
}

fn attach_identity(headers: &mut HeaderMap, session: &AuthSession, mw: &AuthMiddleware) {
    // Invariant I5: header wins when both channels are enabled.
    if mw.config.header {
        set_header(headers, "x-remote-user", &session.user);
        if let Some(group) = &session.group {
            set_header(headers, "x-remote-group", group);
        }
        if let Some(home) = &session.home {
            set_header(headers, "x-remote-home", home);
        }
        if let Some(token) = &session.token {
            set_header(headers, TOKEN_HEADER, token);
        }
    } else if mw.config.cookie {
        let mut jar = CookieJar::new();
        jar = jar.add(Cookie::new("X-Remote-User", session.user.clone()));
        if let Some(group) = &session.group {
            jar = jar.add(Cookie::new("X-Remote-Group", group.clone()));
        }
        if let Some(home) = &session.home {
            jar = jar.add(Cookie::new("X-Remote-Home", home.clone()));
        }
        if let Some(token) = &session.token {
            jar = jar.add(Cookie::new(TOKEN_COOKIE, token.clone()));
        }
        for cookie in jar.iter() {
            if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
                headers.append(header::SET_COOKIE, value);
            }
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

async fn challenge_response(
    mw: &AuthMiddleware,
    request: Request,
    decoded_path: &str,
    next: Next,
) -> Response {
    if is_xhr(request.headers()) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match mw.authn.challenge(&mw.config.realm) {
        Challenge::Redirect { location } => redirect_response(&location),
        Challenge::Unauthenticated { www_authenticate } => match &mw.config.redirect {
            Some(redirect) if path_matches_redirect_target(decoded_path, redirect) => {
                // The login page itself is always admitted (property P6).
                next.run(request).await
            }
            Some(redirect) => redirect_response(redirect),
            None => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                set_header(
                    response.headers_mut(),
                    "www-authenticate",
                    &www_authenticate,
                );
                response
            }
        },
    }
}

fn redirect_response(location: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    set_header(response.headers_mut(), "location", location);
    set_header(response.headers_mut(), "cache-control", "no-cache");
    response
}

/// `path_matches_redirect_target` compares the decoded request path against the path portion
/// of `redirect` (which may be a bare path or a full `scheme://host/path` URL).
fn path_matches_redirect_target(decoded_path: &str, redirect: &str) -> bool {
    let redirect_path = redirect
        .find("://")
        .map(|i| &redirect[i + 3..])
        .and_then(|rest| rest.find('/').map(|j| &rest[j..]))
        .unwrap_or(redirect);
    decoded_path == redirect_path
}

#[cfg(unix)]
fn impersonate(user: &str) {
    use nix::unistd::{getuid, setegid, seteuid, Gid, Uid};

    let Ok(Some(entry)) = pwd::Passwd::from_name(user) else {
        log::warn!("UNIX_E: no passwd entry for user {user:?}, cannot impersonate");
        return;
    };

    let real_uid = getuid();
    if let Err(e) = seteuid(real_uid) {
        log::warn!("UNIX_E: failed to restore privilege before impersonation: {e}");
    }
    if let Err(e) = setegid(Gid::from_raw(entry.gid)) {
        log::warn!(
            "UNIX_E: setegid({}) failed for user {user:?}: {e}",
            entry.gid
        );
    }
    if let Err(e) = seteuid(Uid::from_raw(entry.uid)) {
        log::warn!(
            "UNIX_E: seteuid({}) failed for user {user:?}: {e}",
            entry.uid
        );
    }
}

#[cfg(not(unix))]
fn impersonate(_user: &str) {
    log::warn!("UNIX_E is only supported on unix targets");
}
