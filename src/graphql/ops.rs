//! Operation documents sent to the backend, one constant per screen.

pub const GET_USER: &str = r#"
  query GetUser($email: String!) {
    users(where: {email: {_eq: $email}}) {
      id
      name
      email
      password_hash
    }
  }
"#;

pub const REGISTER_USER: &str = r#"
  mutation RegisterUser($name: String!, $email: String!, $password_hash: String!) {
    insert_users_one(object: {name: $name, email: $email, password_hash: $password_hash}) {
      id
      name
      email
    }
  }
"#;

pub const GROUPS: &str = r#"
  query getClasses {
    chat_rooms {
      id
      name
      creator {
        name
        id
      }
    }
  }

  mutation AddClass($name: String!, $created_by: uuid!) {
    insert_chat_rooms(objects: { name: $name, created_by: $created_by }) {
      affected_rows
      returning {
        id
        name
      }
    }
  }
"#;

pub const CHAT: &str = r#"
  query GetChatsByClass($grpid: uuid!) {
    chat_rooms_by_pk(id: $grpid) {
      id
      name
      messages(order_by: {created_at: asc}) {
        id
        content
        user_id
        created_at
        user {
          name
        }
      }
    }
  }

  subscription RoomFeed($grpid: uuid!) {
    chat_rooms_by_pk(id: $grpid) {
      id
      name
      messages(order_by: {created_at: asc}) {
        id
        content
        user_id
        created_at
        user {
          name
        }
      }
    }
  }

  mutation InsertMessage($content: String!, $user_id: uuid!, $chat_room_id: uuid!) {
    insert_messages(
      objects: {content: $content, user_id: $user_id, chat_room_id: $chat_room_id}
    ) {
      returning {
        id
        content
        user_id
        chat_room_id
        created_at
        user {
          name
        }
      }
    }
  }
"#;
