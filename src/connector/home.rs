//! The home connector (C6.1): redirects an already-authenticated client to its home directory
//! if the request path isn't already under it.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::connector::AuthMiddleware;

pub async fn home_connector(
    State(mw): State<AuthMiddleware>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    // WebSocket upgrades are exempt (property P7): a client mid-handshake can't follow a
    // redirect.
    if request.headers().contains_key("sec-websocket-version") {
        return next.run(request).await;
    }

    let ctx = mw.client_ctx(addr);
    let Some(info) = ctx.info() else {
        return next.run(request).await;
    };

    let Some(home) = info.home else {
        return next.run(request).await;
    };
    if home.is_empty() {
        return next.run(request).await;
    }

    let decoded_path = percent_decode_str(request.uri().path())
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| request.uri().path().to_string());

    let home_prefix = format!("{}/", home.trim_end_matches('/'));
    // Idempotent (property P8): once the path is already under `/<home>/`, don't redirect again.
    if decoded_path.starts_with(&home_prefix) {
        return next.run(request).await;
    }

    let location = home_prefix;
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location)],
    )
        .into_response()
}
