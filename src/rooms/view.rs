use serde::Serialize;
use uuid::Uuid;

use crate::{error::ChatError, models::Message};

use super::{RoomUpdate, SendOutcome, msg};

/// What the open chat page is showing.
#[derive(Debug, Clone)]
pub struct ChatView {
    room_id: Uuid,
    room_name: String,
    messages: Vec<Message>,
    error: Option<String>,
}

/// Socket frame pushed to the page.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Messages { room_name: String, html: String },
    Error { message: String },
}

impl ChatView {
    pub fn new(room_id: Uuid) -> Self {
        Self {
            room_id,
            room_name: String::new(),
            messages: Vec::new(),
            error: None,
        }
    }

    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// A failed refresh keeps the last good messages on screen.
    pub fn apply(&mut self, update: RoomUpdate) {
        match update {
            Ok(Some(room)) => {
                self.room_name = room.name;
                self.messages = room.messages;
                self.error = None;
            }
            Ok(None) => {
                self.messages.clear();
                self.error = Some("Chat room not found".to_owned());
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Returns true when the room has to be re-fetched to show the new message.
    pub fn apply_sent(&mut self, outcome: SendOutcome) -> bool {
        match outcome {
            SendOutcome::Skipped => false,
            SendOutcome::Inserted(message) => {
                self.messages.push(message);
                self.error = None;
                false
            }
            SendOutcome::NeedsRefetch => true,
        }
    }

    pub fn fail(&mut self, error: &ChatError) {
        self.error = Some(error.to_string());
    }

    /// Messages in the order held, never re-sorted.
    pub fn render_messages(&self) -> String {
        if self.messages.is_empty() {
            return "<p>No messages yet.</p>".to_owned();
        }
        self.messages.iter().map(msg::msg_to_html).collect()
    }

    pub fn frame(&self) -> Frame {
        match &self.error {
            Some(message) => Frame::Error { message: message.clone() },
            None => Frame::Messages {
                room_name: self.room_name.clone(),
                html: self.render_messages(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{Author, Room};

    fn message(n: u128, content: &str, created_at: &str) -> Message {
        Message {
            id: Uuid::from_u128(n),
            content: content.to_owned(),
            user_id: None,
            chat_room_id: None,
            created_at: created_at.to_owned(),
            user: Some(Author { name: Some("Ana".to_owned()) }),
        }
    }

    fn room(messages: Vec<Message>) -> Room {
        Room { id: Uuid::from_u128(99), name: "general".to_owned(), messages }
    }

    #[test]
    fn renders_in_backend_order() {
        let messages: Vec<_> = (1..=5)
            .map(|n| message(n, &format!("message {n}"), &format!("2024-06-01T10:0{n}:00+00:00")))
            .collect();
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(messages))));

        let html = view.render_messages();
        let positions: Vec<_> = (1..=5)
            .map(|n| html.find(&format!("message {n}")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn does_not_resort_out_of_order_input() {
        let messages = vec![
            message(1, "later", "2024-06-01T12:00:00+00:00"),
            message(2, "earlier", "2024-06-01T09:00:00+00:00"),
        ];
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(messages.clone()))));

        assert_eq!(view.messages(), messages.as_slice());
        let html = view.render_messages();
        assert!(html.find("later").unwrap() < html.find("earlier").unwrap());
    }

    #[test]
    fn errors_keep_the_last_good_messages() {
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(vec![message(1, "hi", "2024-06-01T10:00:00+00:00")]))));
        view.apply(Err(ChatError::GraphQl("boom".to_owned())));

        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.frame(), Frame::Error { message: "boom".to_owned() });

        view.apply(Ok(Some(room(vec![]))));
        assert_eq!(view.error(), None);
        assert_eq!(view.render_messages(), "<p>No messages yet.</p>");
    }

    #[test]
    fn missing_room_is_reported() {
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(vec![message(1, "hi", "2024-06-01T10:00:00+00:00")]))));
        view.apply(Ok(None));

        assert!(view.messages().is_empty());
        assert_eq!(view.error(), Some("Chat room not found"));
    }

    #[test]
    fn inserted_rows_are_appended() {
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(vec![message(1, "first", "2024-06-01T10:00:00+00:00")]))));

        assert!(!view.apply_sent(SendOutcome::Inserted(message(2, "second", "2024-06-01T10:01:00+00:00"))));
        assert!(!view.apply_sent(SendOutcome::Skipped));
        assert!(view.apply_sent(SendOutcome::NeedsRefetch));
        assert_eq!(view.messages().len(), 2);
        assert_eq!(view.messages()[1].content, "second");
    }

    #[test]
    fn frames_are_tagged() {
        let mut view = ChatView::new(Uuid::from_u128(99));
        view.apply(Ok(Some(room(vec![]))));
        assert_eq!(
            serde_json::to_value(view.frame()).unwrap(),
            json!({"type": "messages", "room_name": "general", "html": "<p>No messages yet.</p>"})
        );
    }
}
