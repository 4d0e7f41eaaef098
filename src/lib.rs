pub mod appresult;
pub mod auth;
pub mod config;
pub mod error;
pub mod graphql;
pub mod groups;
pub mod index;
pub mod models;
pub mod res;
pub mod rooms;
pub mod session;

use std::sync::Arc;

use axum::{Router, extract::FromRef, routing::get};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

pub use appresult::{AppError, AppResult};
pub use config::Config;

use graphql::{HttpTransport, SplitTransport, WsLink};

pub type Graphql = Arc<SplitTransport>;
pub type Settings = Arc<Config>;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub graphql: Graphql,
    pub settings: Settings,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = HttpTransport::new(&config.http_endpoint, &config.admin_secret);
        let ws = WsLink::new(&config.ws_endpoint, &config.admin_secret);

        Self {
            graphql: Arc::new(SplitTransport::new(http, ws)),
            settings: Arc::new(config),
        }
    }
}

/// Every route, behind the cookie session layer.
pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(state.settings.session_inactivity));

    Router::new()
        .route("/", get(index::index))
        .route("/dashboard", get(index::dashboard))
        .route("/style.css", get(res::stylesheet))
        .merge(auth::router())
        .merge(groups::router())
        .nest("/groups", rooms::router())
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
