use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `users` row as the login lookup returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Joined `user { name }` on a message. The row may be gone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub chat_room_id: Option<Uuid>,
    pub created_at: String,
    #[serde(default)]
    pub user: Option<Author>,
}

impl Message {
    pub fn author_label(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Anonymous")
    }
}

/// A chat room together with its messages, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub creator: Option<Creator>,
}

impl Group {
    pub fn creator_label(&self) -> &str {
        self.creator.as_ref().map_or("Unknown", |c| c.name.as_str())
    }
}
