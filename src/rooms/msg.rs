use pulldown_cmark::{CowStr, Event, Parser, Tag, html};
use time::{OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::{include_res, models::Message, res};

pub(crate) fn msg_to_html(message: &Message) -> String {
    res::fill(
        include_res!(str, "/pages/rooms/message.html"),
        &[
            ("id", message.id.to_string().as_str()),
            ("author", res::escape(message.author_label()).as_str()),
            ("timestamp", res::escape(&timestamp(&message.created_at)).as_str()),
            ("content", markdown(&message.content).as_str()),
        ],
    )
}

/// Markdown to HTML, with any raw HTML in the source shown as text and
/// scripting URLs stripped from links and images.
pub(crate) fn markdown(content: &str) -> String {
    let parser = Parser::new(content).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: CowStr::Borrowed("#"), title, id })
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) if !safe_url(&dest_url) => {
            Event::Start(Tag::Image { link_type, dest_url: CowStr::Borrowed(""), title, id })
        }
        _ => event,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Relative references, or absolute ones with an http(s) or mailto scheme.
fn safe_url(url: &str) -> bool {
    // browsers drop whitespace and control characters before reading the scheme
    let url: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match url.find([':', '/', '?', '#']) {
        Some(at) if url[at..].starts_with(':') => matches!(&url[..at], "http" | "https" | "mailto"),
        _ => true,
    }
}

/// `2024-06-01 10:00`, or the raw value if the backend sent something unexpected.
pub(crate) fn timestamp(created_at: &str) -> String {
    let shown = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );

    OffsetDateTime::parse(created_at, &Rfc3339)
        .ok()
        .and_then(|at| at.format(shown).ok())
        .or_else(|| {
            PrimitiveDateTime::parse(created_at, naive)
                .ok()
                .and_then(|at| at.format(shown).ok())
        })
        .unwrap_or_else(|| created_at.to_owned())
}
