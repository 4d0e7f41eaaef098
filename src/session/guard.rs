use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::{SessionStore, SessionUser};

/// Extractor for protected routes: yields the logged in user or bounces the
/// request to `/login`, remembering where it was headed.
pub struct CurrentUser {
    pub user: SessionUser,
    pub store: SessionStore<Session>,
}

impl<St: Send + Sync> FromRequestParts<St> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &St) -> Result<Self, Self::Rejection> {
        let store = SessionStore::<Session>::from_request_parts(parts, state).await?;

        match store.current() {
            Some(user) => Ok(Self { user, store }),
            None => Err(Redirect::to(&login_redirect(parts.uri.path())).into_response()),
        }
    }
}

pub(crate) fn login_redirect(path: &str) -> String {
    // socket upgrades can't follow a redirect to a page, send them back to the room
    let path = path.strip_suffix("/ws").unwrap_or(path);
    format!("/login?return_url={path}")
}

/// Only same-site absolute paths are followed after login. Anything outside
/// printable ASCII is refused: browsers strip tabs and newlines, turning
/// `/\t/host` into `//host`, and the value has to fit in a `Location` header.
pub(crate) fn safe_return_url<'a>(return_url: Option<&'a str>, fallback: &'a str) -> &'a str {
    match return_url {
        Some(url)
            if url.starts_with('/')
                && !url.starts_with("//")
                && !url.contains('\\')
                && url.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            url
        }
        _ => fallback,
    }
}
