use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::{
    AppResult,
    session::{SessionStore, safe_return_url},
};

#[derive(Deserialize)]
pub(crate) struct LogoutQuery {
    pub(crate) return_url: Option<String>,
}

#[debug_handler]
pub(crate) async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    store: SessionStore<Session>,
) -> AppResult<Redirect> {
    if let Some(user) = store.current() {
        info!(user_id = %user.id, "logged out");
    }
    store.clear().await?;
    Ok(Redirect::to(safe_return_url(return_url.as_deref(), "/login")))
}
