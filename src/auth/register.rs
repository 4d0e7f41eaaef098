use axum::{
    Form, debug_handler,
    extract::State,
    response::{Html, IntoResponse},
};

use crate::{Graphql, Settings, include_res, res};

use super::RegisterForm;

fn page(form: &RegisterForm, error: Option<&str>, success: Option<&str>, refresh: &str) -> Html<String> {
    let alerts = res::alert("error", error) + &res::alert("success", success);
    Html(res::fill(
        include_res!(str, "/pages/register.html"),
        &[
            ("refresh", refresh),
            ("alert", alerts.as_str()),
            ("name", res::escape(&form.name).as_str()),
            ("email", res::escape(&form.email).as_str()),
        ],
    ))
}

#[debug_handler]
pub(crate) async fn register_page() -> impl IntoResponse {
    page(&RegisterForm::default(), None, None, "")
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(graphql): State<Graphql>,
    State(settings): State<Settings>,
    Form(form): Form<RegisterForm>,
) -> impl IntoResponse {
    match super::register_user(graphql.as_ref(), &form).await {
        Ok(_) => {
            // no auto-login: show the banner, then bounce to the login page
            let refresh = format!(
                r#"<meta http-equiv="refresh" content="{};url=/login">"#,
                settings.register_redirect.as_secs()
            );
            page(&RegisterForm::default(), None, Some("User registered successfully!"), &refresh)
        }
        Err(e) => page(&form, Some(&e.to_string()), None, ""),
    }
}
