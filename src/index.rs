use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::session::SessionStore;

#[debug_handler]
pub async fn index(store: SessionStore<Session>) -> Redirect {
    if store.is_authenticated() {
        Redirect::to("/groups")
    } else {
        Redirect::to("/login")
    }
}

/// The old single-room dashboard now lives under the group list.
#[debug_handler]
pub async fn dashboard() -> Redirect {
    Redirect::permanent("/groups")
}
