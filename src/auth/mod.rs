use axum::{Router, routing::get};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    error::{ChatError, ChatResult},
    graphql::{GraphQlRequest, Transport, ops},
    models::UserRecord,
    session::{SessionStorage, SessionStore, SessionUser},
};

mod login;
mod logout;
pub mod password;
mod register;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", get(register::register_page).post(register::register))
        .route("/logout", get(logout::logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Creates the account. The caller stays logged out.
pub async fn register_user<T: Transport>(transport: &T, form: &RegisterForm) -> ChatResult<SessionUser> {
    if form.name.trim().is_empty() || form.email.trim().is_empty() || form.password.trim().is_empty() {
        return Err(ChatError::validation("Please fill in all fields"));
    }

    #[derive(Deserialize)]
    struct Inserted {
        insert_users_one: Option<SessionUser>,
    }

    let password_hash = password::hash(&form.password)?;
    let Inserted { insert_users_one } = transport
        .execute(GraphQlRequest::new(
            ops::REGISTER_USER,
            "RegisterUser",
            json!({
                "name": form.name.trim(),
                "email": form.email.trim(),
                "password_hash": password_hash,
            }),
        ))
        .await?
        .into_data()?;

    let user = insert_users_one
        .ok_or_else(|| ChatError::GraphQl("Registration was not accepted".to_owned()))?;
    info!(user_id = %user.id, "registered user");
    Ok(user)
}

/// Anonymous → authenticated. On any failure the session is left untouched.
pub async fn log_in<T: Transport, S: SessionStorage>(
    transport: &T,
    store: &SessionStore<S>,
    email: &str,
    password: &str,
) -> ChatResult<SessionUser> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(ChatError::validation("Please fill in both email and password"));
    }

    #[derive(Deserialize)]
    struct Users {
        users: Vec<UserRecord>,
    }

    let Users { users } = transport
        .execute(GraphQlRequest::new(ops::GET_USER, "GetUser", json!({ "email": email.trim() })))
        .await?
        .into_data()?;

    let Some(record) = users.into_iter().next() else {
        return Err(ChatError::validation("User not found"));
    };
    if !password::verify(password, &record.password_hash) {
        warn!(user_id = %record.id, "rejected login");
        return Err(ChatError::validation("Incorrect password"));
    }

    let user = SessionUser {
        id: record.id,
        name: record.name,
        email: record.email,
    };
    store
        .set(Some(user.clone()))
        .await
        .map_err(|e| ChatError::Session(e.to_string()))?;

    info!(user_id = %user.id, "logged in");
    Ok(user)
}
