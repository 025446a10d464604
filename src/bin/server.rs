//! A minimal server demonstrating how to wire `AuthMiddleware` onto an axum `Router`: parse
//! `Config` from the environment/CLI, build the middleware, and layer it in front of a couple
//! of example routes. Grounded on the teacher's `http::serve`/`api_router` wiring, adapted for a
//! single-binary crate instead of a workspace split across `api`/`cli` members.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use auth_connector::{AuthMiddleware, Config, CurrentUser};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::parse();
    let middleware = AuthMiddleware::new(config).context("failed to build auth middleware")?;

    let app = Router::new()
        .route("/", get(index))
        .route("/whoami", get(whoami))
        .layer(TraceLayer::new_for_http());
    let app = middleware.layer(app);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080));
    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("error running HTTP server")
}

async fn index() -> &'static str {
    "ok"
}

async fn whoami(CurrentUser(session): CurrentUser) -> String {
    session.user
}
