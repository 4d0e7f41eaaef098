mod feed;
mod msg;
mod room;
mod view;
mod ws;

use axum::{Router, routing::get};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::ChatResult,
    graphql::{GraphQlRequest, GraphQlResponse, Transport, ops},
    models::{Message, Room},
    session::SessionUser,
};

pub use feed::RoomFeed;
pub use view::ChatView;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{uuid}", get(room::room))
        .route("/{uuid}/ws", get(ws::room_ws))
}

/// One refresh of a room: the room with its messages, `None` if it doesn't exist, or why it failed.
pub type RoomUpdate = ChatResult<Option<Room>>;

pub fn room_request(operation_name: &str, room_id: Uuid) -> GraphQlRequest {
    GraphQlRequest::new(ops::CHAT, operation_name, json!({ "grpid": room_id }))
}

pub fn decode_room(response: GraphQlResponse) -> RoomUpdate {
    #[derive(Deserialize)]
    struct ByPk {
        chat_rooms_by_pk: Option<Room>,
    }

    let ByPk { chat_rooms_by_pk } = response.into_data()?;
    Ok(chat_rooms_by_pk)
}

/// The whole room, messages oldest first as the backend ordered them.
pub async fn fetch_room<T: Transport>(transport: &T, room_id: Uuid) -> RoomUpdate {
    decode_room(transport.execute(room_request("GetChatsByClass", room_id)).await?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing worth sending; no request was made.
    Skipped,
    /// The backend echoed the new row back.
    Inserted(Message),
    /// Stored, but without the row; the room has to be fetched again.
    NeedsRefetch,
}

/// Fire and forget: concurrent or repeated sends are not deduplicated.
pub async fn send_message<T: Transport>(
    transport: &T,
    user: &SessionUser,
    room_id: Uuid,
    content: &str,
) -> ChatResult<SendOutcome> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(SendOutcome::Skipped);
    }

    #[derive(Deserialize)]
    struct Returning {
        returning: Vec<Message>,
    }
    #[derive(Deserialize)]
    struct Inserted {
        insert_messages: Option<Returning>,
    }

    let Inserted { insert_messages } = transport
        .execute(GraphQlRequest::new(
            ops::CHAT,
            "InsertMessage",
            json!({
                "content": content,
                "user_id": user.id,
                "chat_room_id": room_id,
            }),
        ))
        .await?
        .into_data()?;

    Ok(
        match insert_messages.and_then(|inserted| inserted.returning.into_iter().next()) {
            Some(message) => SendOutcome::Inserted(message),
            None => SendOutcome::NeedsRefetch,
        },
    )
}
