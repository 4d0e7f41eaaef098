use axum::{
    debug_handler,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_res!(str, "/style.css"),
    )
}

/// 404 page for a room or page that isn't there.
pub fn sorry(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(fill(include_res!(str, "/pages/sorry.html"), &[("what", escape(what).as_str())])),
    )
        .into_response()
}

/// Substitutes `{key}` placeholders in one pass. Inserted values are never
/// scanned again, so user text that looks like a placeholder stays literal.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find(|(key, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*key))
                .is_some_and(|t| t.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Error/success banner, or nothing.
pub fn alert(kind: &str, message: Option<&str>) -> String {
    let Some(message) = message else {
        return String::new();
    };
    let prefix = if kind == "error" { "Error: " } else { "" };
    format!(r#"<div class="alert alert-{kind}">{prefix}{}</div>"#, escape(message))
}

/// Escapes text for use in element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
