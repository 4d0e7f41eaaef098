use axum::{Router, routing::get};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    error::{ChatError, ChatResult},
    graphql::{GraphQlRequest, Transport, ops},
    models::Group,
    session::SessionUser,
};

mod page;

pub fn router() -> Router<AppState> {
    Router::new().route("/groups", get(page::groups_page).post(page::new_group))
}

/// Every room, with whoever made it. There is no membership model: all rooms are visible to all users.
pub async fn list_groups<T: Transport>(transport: &T) -> ChatResult<Vec<Group>> {
    #[derive(Deserialize)]
    struct Rooms {
        chat_rooms: Vec<Group>,
    }

    let Rooms { chat_rooms } = transport
        .execute(GraphQlRequest::new(ops::GROUPS, "getClasses", json!({})))
        .await?
        .into_data()?;
    Ok(chat_rooms)
}

/// Creates a room owned by `user`. A blank name is refused before any request goes out.
pub async fn create_group<T: Transport>(transport: &T, user: &SessionUser, name: &str) -> ChatResult<Group> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::validation("Please enter a group name"));
    }

    #[derive(Deserialize)]
    struct Returning {
        returning: Vec<Group>,
    }
    #[derive(Deserialize)]
    struct Inserted {
        insert_chat_rooms: Option<Returning>,
    }

    let Inserted { insert_chat_rooms } = transport
        .execute(GraphQlRequest::new(
            ops::GROUPS,
            "AddClass",
            json!({ "name": name, "created_by": user.id }),
        ))
        .await?
        .into_data()?;

    let group = insert_chat_rooms
        .and_then(|inserted| inserted.returning.into_iter().next())
        .ok_or_else(|| ChatError::GraphQl("Group was not created".to_owned()))?;
    info!(group_id = %group.id, user_id = %user.id, "created group");
    Ok(group)
}
