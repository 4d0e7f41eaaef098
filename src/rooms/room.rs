use axum::{
    debug_handler,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use uuid::Uuid;

use crate::{Graphql, include_res, res, session::CurrentUser};

use super::{ChatView, fetch_room};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room(
    State(graphql): State<Graphql>,
    _user: CurrentUser,
    Path(room_id): Path<Uuid>,
) -> Response {
    let update = fetch_room(graphql.as_ref(), room_id).await;
    if matches!(update, Ok(None)) {
        return res::sorry("room");
    }

    let mut view = ChatView::new(room_id);
    view.apply(update);

    let room_name = if view.room_name().is_empty() {
        "No room selected"
    } else {
        view.room_name()
    };

    Html(res::fill(
        include_res!(str, "/pages/rooms/room.html"),
        &[
            ("room_id", room_id.to_string().as_str()),
            ("room_name", res::escape(room_name).as_str()),
            ("alert", res::alert("error", view.error()).as_str()),
            ("messages", view.render_messages().as_str()),
        ],
    ))
    .into_response()
}
