//! End-to-end tests driving a real axum router through `AuthMiddleware`, exercising the
//! connector state machine the way the teacher's `http` integration tests drive a router
//! through `TestClient` (adapted here to `tower::ServiceExt::oneshot` since there's no running
//! server to point a client at).

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tower::ServiceExt;

use crate::authz::{AuthzBackend, SimpleBackend};
use crate::config::{AuthnType, AuthzType, Config};
use crate::connector::AuthMiddleware;

fn base_config() -> Config {
    Config {
        authn_type: AuthnType::Basic,
        authz_type: AuthzType::Simple,
        token: false,
        header: true,
        cookie: false,
        home: false,
        unix: false,
        exclusive_server: false,
        algo: None,
        protect: "*".to_string(),
        unprotect: String::new(),
        redirect: None,
        expire: 0,
        verify_any_method_under_redirect: false,
        allow_header_logout: true,
        realm: "auth".to_string(),
        authz_source: None,
    }
}

fn router_with(mw: AuthMiddleware) -> Router {
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/login", get(|| async { "login page" }))
        .route("/home/alice/page", get(|| async { "home page" }));
    mw.layer(app)
}

fn simple_users(mw: &AuthMiddleware) -> &SimpleBackend {
    mw.authz
        .as_any()
        .downcast_ref::<SimpleBackend>()
        .expect("simple backend")
}

fn request(method: &str, path: &str) -> Request<Body> {
    let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
    let mut req = Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

fn basic_auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:{pass}")))
}

#[tokio::test]
async fn protected_route_without_credentials_gets_401() {
    let mw = AuthMiddleware::new(base_config()).unwrap();
    let app = router_with(mw);

    let response = app.oneshot(request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn valid_basic_credentials_are_admitted() {
    let mw = AuthMiddleware::new(base_config()).unwrap();
    simple_users(&mw).add_user("alice", crate::authz::StoredSecret::Plain("secret".into()));
    let app = router_with(mw);

    let mut req = request("GET", "/");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "secret").parse().unwrap(),
    );

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_still_gets_401() {
    let mw = AuthMiddleware::new(base_config()).unwrap();
    simple_users(&mw).add_user("alice", crate::authz::StoredSecret::Plain("secret".into()));
    let app = router_with(mw);

    let mut req = request("GET", "/");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "wrong").parse().unwrap(),
    );

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unprotected_path_is_admitted_without_credentials() {
    let mut config = base_config();
    config.protect = "/private/*".to_string();
    let mw = AuthMiddleware::new(config).unwrap();
    let app = router_with(mw);

    let response = app.oneshot(request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn second_request_on_same_connection_skips_reverification() {
    let mw = AuthMiddleware::new(base_config()).unwrap();
    simple_users(&mw).add_user("alice", crate::authz::StoredSecret::Plain("secret".into()));
    let app = router_with(mw);

    let mut first = request("GET", "/");
    first.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "secret").parse().unwrap(),
    );
    let response = app.clone().oneshot(first).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // No Authorization header on the second request - same peer address, same connection.
    let second = request("GET", "/");
    let response = app.oneshot(second).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn xhr_requests_get_403_instead_of_a_redirect() {
    let mut config = base_config();
    config.redirect = Some("/login".to_string());
    let mw = AuthMiddleware::new(config).unwrap();
    let app = router_with(mw);

    let mut req = request("GET", "/");
    req.headers_mut()
        .insert("x-requested-with", "XMLHttpRequest".parse().unwrap());

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_request_redirects_to_login_page() {
    let mut config = base_config();
    config.redirect = Some("/login".to_string());
    let mw = AuthMiddleware::new(config).unwrap();
    let app = router_with(mw);

    let response = app.oneshot(request("GET", "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn login_page_itself_is_always_admitted() {
    let mut config = base_config();
    config.redirect = Some("/login".to_string());
    let mw = AuthMiddleware::new(config).unwrap();
    let app = router_with(mw);

    let response = app.oneshot(request("GET", "/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn token_channel_verifies_against_a_joined_token() {
    let mut config = base_config();
    config.token = true;
    let mw = AuthMiddleware::new(config).unwrap();
    let backend = simple_users(&mw);
    backend.add_user("alice", crate::authz::StoredSecret::Plain("secret".into()));
    backend.join("alice", "preshared-token", 0).unwrap();
    let app = router_with(mw);

    let mut req = request("GET", "/");
    req.headers_mut()
        .insert("x-auth-token", "preshared-token".parse().unwrap());

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn home_redirect_is_skipped_for_websocket_upgrades() {
    let mut config = base_config();
    config.home = true;
    let mw = AuthMiddleware::new(config).unwrap();
    simple_users(&mw).add_user_full(
        "alice",
        crate::authz::StoredSecret::Plain("secret".into()),
        None,
        Some("/home/alice".into()),
    );
    let app = router_with(mw);

    // Authenticate first so the connection's cached session (and its `home`) is populated.
    let mut first = request("GET", "/");
    first.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "secret").parse().unwrap(),
    );
    let response = app.clone().oneshot(first).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Out-of-home request on the same connection, but mid-WebSocket-handshake (property P7):
    // never redirected, even though a plain request would be.
    let mut second = request("GET", "/");
    second
        .headers_mut()
        .insert("sec-websocket-version", "13".parse().unwrap());
    let response = app.oneshot(second).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn home_redirect_sends_authenticated_client_to_its_home_directory() {
    let mut config = base_config();
    config.home = true;
    let mw = AuthMiddleware::new(config).unwrap();
    simple_users(&mw).add_user_full(
        "alice",
        crate::authz::StoredSecret::Plain("secret".into()),
        None,
        Some("/home/alice".into()),
    );
    let app = router_with(mw);

    // Authenticate first so the connection's cached session (and its `home`) is populated.
    let mut first = request("GET", "/");
    first.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "secret").parse().unwrap(),
    );
    let response = app.clone().oneshot(first).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Second request on the same connection, no credentials needed (I1) and outside the home
    // directory: redirected.
    let second = request("GET", "/");
    let response = app.clone().oneshot(second).await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/home/alice/"
    );

    // Idempotent (property P8): a request already under `/home/alice/` passes through.
    let third = request("GET", "/home/alice/page");
    let response = app.oneshot(third).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn successful_verification_attaches_identity_headers() {
    let mw = AuthMiddleware::new(base_config()).unwrap();
    simple_users(&mw).add_user("alice", crate::authz::StoredSecret::Plain("secret".into()));
    let app = router_with(mw);

    let mut req = request("GET", "/");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth_header("alice", "secret").parse().unwrap(),
    );

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.headers().get("x-remote-user").unwrap(), "alice");
}
