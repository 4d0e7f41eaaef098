use axum::{
    Form, debug_handler,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    Graphql, include_res, res,
    session::{SessionStore, safe_return_url},
};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) return_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    return_url: Option<String>,
}

fn page(error: Option<&str>, email: &str, return_url: Option<&str>) -> Html<String> {
    Html(res::fill(
        include_res!(str, "/pages/login.html"),
        &[
            ("alert", res::alert("error", error).as_str()),
            ("email", res::escape(email).as_str()),
            ("return_url", res::escape(return_url.unwrap_or("")).as_str()),
        ],
    ))
}

#[debug_handler]
pub(crate) async fn login_page(
    Query(LoginQuery { return_url }): Query<LoginQuery>,
    store: SessionStore<Session>,
) -> Response {
    if store.is_authenticated() {
        return Redirect::to(safe_return_url(return_url.as_deref(), "/groups")).into_response();
    }

    page(None, "", return_url.as_deref()).into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(graphql): State<Graphql>,
    store: SessionStore<Session>,
    Form(form): Form<LoginForm>,
) -> Response {
    match super::log_in(graphql.as_ref(), &store, &form.email, &form.password).await {
        Ok(_) => Redirect::to(safe_return_url(form.return_url.as_deref(), "/groups")).into_response(),
        Err(e) => page(Some(&e.to_string()), &form.email, form.return_url.as_deref()).into_response(),
    }
}
