//! In-process stand-in for the hosted GraphQL backend.
//!
//! Answers the handful of operations the app sends, by `operationName`, over
//! plain HTTP and over a `graphql-transport-ws` socket, and records every
//! operation it sees so tests can assert on what went over the wire.

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::{SinkExt, StreamExt};
use internconnect::{AppState, Config, app};
use reqwest::{
    Client, Url,
    cookie::{CookieStore, Jar},
    redirect::Policy,
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::broadcast};
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

/// Runs the whole app against `fake` on an ephemeral port and returns its base URL.
pub async fn serve_app(fake: &FakeHasura, poll_interval: Duration) -> String {
    let config = Config {
        http_endpoint: fake.http_url(),
        ws_endpoint: fake.ws_url(),
        admin_secret: SECRET.to_owned(),
        poll_interval,
        ..Config::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app(AppState::new(config))).await.unwrap() });
    format!("http://{addr}")
}

/// A browser stand-in: keeps cookies, never follows redirects.
pub fn browser() -> (Client, Arc<Jar>) {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(jar.clone())
        .redirect(Policy::none())
        .build()
        .unwrap();
    (client, jar)
}

/// The `Cookie` header the jar would send to `base`.
pub fn cookie_header(jar: &Jar, base: &str) -> Option<String> {
    jar.cookies(&Url::parse(base).unwrap())
        .map(|value| value.to_str().unwrap().to_owned())
}

/// Posts the login form and insists on the redirect that means success.
pub async fn sign_in(client: &Client, base: &str, email: &str, password: &str) {
    let response = client
        .post(format!("{base}/login"))
        .form(&[("email", email), ("password", password)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login as {email} failed");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Http,
    Socket,
}

#[derive(Debug, Clone)]
pub struct Seen {
    pub channel: Channel,
    pub operation: String,
    pub variables: Value,
    pub secret: Option<String>,
}

#[derive(Default)]
struct Backend {
    users: Vec<Value>,
    rooms: Vec<Value>,
    messages: Vec<Value>,
    seen: Vec<Seen>,
    forced: Option<(StatusCode, String)>,
    hide_inserted_rows: bool,
}

#[derive(Clone)]
pub struct FakeHasura {
    backend: Arc<Mutex<Backend>>,
    changes: broadcast::Sender<()>,
    pub addr: SocketAddr,
}

impl FakeHasura {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let fake = Self {
            backend: Arc::default(),
            changes: broadcast::channel(16).0,
            addr,
        };

        let app = Router::new()
            .route("/v1/graphql", post(http_operation).get(socket_operation))
            .with_state(fake.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        fake
    }

    pub fn http_url(&self) -> String {
        format!("http://{}/v1/graphql", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/v1/graphql", self.addr)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.backend.lock().unwrap().seen.clone()
    }

    pub fn operations(&self) -> Vec<(Channel, String)> {
        self.seen()
            .into_iter()
            .map(|seen| (seen.channel, seen.operation))
            .collect()
    }

    /// Every HTTP call answers with `status` and `body` until cleared.
    pub fn force_response(&self, forced: Option<(StatusCode, &str)>) {
        self.backend.lock().unwrap().forced = forced.map(|(status, body)| (status, body.to_owned()));
    }

    /// Inserts still happen, but `returning` comes back empty.
    pub fn hide_inserted_rows(&self, hide: bool) {
        self.backend.lock().unwrap().hide_inserted_rows = hide;
    }

    pub fn seed_user(&self, name: &str, email: &str, password_hash: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.backend.lock().unwrap().users.push(json!({
            "id": id, "name": name, "email": email, "password_hash": password_hash
        }));
        id
    }

    pub fn seed_room(&self, name: &str, created_by: Uuid) -> Uuid {
        let id = Uuid::now_v7();
        self.backend.lock().unwrap().rooms.push(json!({
            "id": id, "name": name, "created_by": created_by
        }));
        id
    }

    pub fn stored_password_hash(&self, email: &str) -> Option<String> {
        self.backend
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u["email"] == email)
            .map(|u| u["password_hash"].as_str().unwrap().to_owned())
    }

    fn record(&self, channel: Channel, body: &Value, secret: Option<String>) {
        self.backend.lock().unwrap().seen.push(Seen {
            channel,
            operation: body["operationName"].as_str().unwrap_or_default().to_owned(),
            variables: body["variables"].clone(),
            secret,
        });
    }

    fn room_snapshot(&self, room_id: &str) -> Value {
        let backend = self.backend.lock().unwrap();
        let Some(room) = backend.rooms.iter().find(|r| r["id"] == room_id) else {
            return json!({ "chat_rooms_by_pk": null });
        };
        let messages: Vec<Value> = backend
            .messages
            .iter()
            .filter(|m| m["chat_room_id"] == room_id)
            .map(|m| {
                let author = backend
                    .users
                    .iter()
                    .find(|u| u["id"] == m["user_id"])
                    .map(|u| json!({ "name": u["name"] }));
                json!({
                    "id": m["id"],
                    "content": m["content"],
                    "user_id": m["user_id"],
                    "created_at": m["created_at"],
                    "user": author,
                })
            })
            .collect();

        json!({ "chat_rooms_by_pk": { "id": room["id"], "name": room["name"], "messages": messages } })
    }

    fn resolve(&self, operation: &str, vars: &Value) -> Value {
        match operation {
            "GetUser" => {
                let backend = self.backend.lock().unwrap();
                let users: Vec<_> = backend
                    .users
                    .iter()
                    .filter(|u| u["email"] == vars["email"])
                    .cloned()
                    .collect();
                json!({ "data": { "users": users } })
            }
            "RegisterUser" => {
                let mut backend = self.backend.lock().unwrap();
                if backend.users.iter().any(|u| u["email"] == vars["email"]) {
                    return json!({ "errors": [{
                        "message": "Uniqueness violation. duplicate key value violates unique constraint \"users_email_key\""
                    }]});
                }
                let id = Uuid::now_v7();
                backend.users.push(json!({
                    "id": id,
                    "name": vars["name"],
                    "email": vars["email"],
                    "password_hash": vars["password_hash"],
                }));
                json!({ "data": { "insert_users_one": {
                    "id": id, "name": vars["name"], "email": vars["email"]
                }}})
            }
            "getClasses" => {
                let backend = self.backend.lock().unwrap();
                let rooms: Vec<_> = backend
                    .rooms
                    .iter()
                    .map(|r| {
                        let creator = backend
                            .users
                            .iter()
                            .find(|u| u["id"] == r["created_by"])
                            .map(|u| json!({ "id": u["id"], "name": u["name"] }));
                        json!({ "id": r["id"], "name": r["name"], "creator": creator })
                    })
                    .collect();
                json!({ "data": { "chat_rooms": rooms } })
            }
            "AddClass" => {
                let id = Uuid::now_v7();
                self.backend.lock().unwrap().rooms.push(json!({
                    "id": id, "name": vars["name"], "created_by": vars["created_by"]
                }));
                json!({ "data": { "insert_chat_rooms": {
                    "affected_rows": 1,
                    "returning": [{ "id": id, "name": vars["name"] }]
                }}})
            }
            "GetChatsByClass" | "RoomFeed" => {
                let room_id = vars["grpid"].as_str().unwrap_or_default().to_owned();
                json!({ "data": self.room_snapshot(&room_id) })
            }
            "InsertMessage" => {
                let response = {
                    let mut backend = self.backend.lock().unwrap();
                    let n = backend.messages.len();
                    let author = backend
                        .users
                        .iter()
                        .find(|u| u["id"] == vars["user_id"])
                        .map(|u| json!({ "name": u["name"] }));
                    let row = json!({
                        "id": Uuid::now_v7(),
                        "content": vars["content"],
                        "user_id": vars["user_id"],
                        "chat_room_id": vars["chat_room_id"],
                        "created_at": format!("2024-06-01T10:{:02}:{:02}+00:00", n / 60, n % 60),
                    });
                    backend.messages.push(row.clone());

                    let mut echoed = row;
                    echoed["user"] = author.unwrap_or(Value::Null);
                    let returning = if backend.hide_inserted_rows { vec![] } else { vec![echoed] };
                    json!({ "data": { "insert_messages": { "returning": returning } } })
                };
                let _ = self.changes.send(());
                response
            }
            other => json!({ "errors": [{ "message": format!("unknown operation {other}") }] }),
        }
    }
}

async fn http_operation(
    State(fake): State<FakeHasura>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let secret = headers
        .get("x-hasura-admin-secret")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    fake.record(Channel::Http, &body, secret);

    let forced = fake.backend.lock().unwrap().forced.clone();
    if let Some((status, body)) = forced {
        return (status, body).into_response();
    }

    let operation = body["operationName"].as_str().unwrap_or_default();
    Json(fake.resolve(operation, &body["variables"])).into_response()
}

async fn socket_operation(State(fake): State<FakeHasura>, ws: WebSocketUpgrade) -> Response {
    ws.protocols(["graphql-transport-ws"])
        .on_upgrade(move |socket| serve_socket(fake, socket))
}

fn frame(value: Value) -> Message {
    Message::Text(value.to_string().into())
}

async fn serve_socket(fake: FakeHasura, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes = fake.changes.subscribe();
    let mut secret = None;
    // id -> (operation, variables)
    let mut live: Vec<(String, String, Value)> = Vec::new();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(Message::Text(raw))) = incoming else {
                    break;
                };
                let msg: Value = serde_json::from_str(raw.as_str()).unwrap();
                match msg["type"].as_str().unwrap_or_default() {
                    "connection_init" => {
                        secret = msg["payload"]["headers"]["x-hasura-admin-secret"]
                            .as_str()
                            .map(str::to_owned);
                        if sender.send(frame(json!({ "type": "connection_ack" }))).await.is_err() {
                            break;
                        }
                    }
                    "subscribe" => {
                        let id = msg["id"].as_str().unwrap().to_owned();
                        let payload = &msg["payload"];
                        fake.record(Channel::Socket, payload, secret.clone());
                        let operation = payload["operationName"].as_str().unwrap_or_default().to_owned();
                        let variables = payload["variables"].clone();
                        let result = fake.resolve(&operation, &variables);
                        live.push((id.clone(), operation, variables));
                        let next = json!({ "id": id, "type": "next", "payload": result });
                        if sender.send(frame(next)).await.is_err() {
                            break;
                        }
                    }
                    "complete" => {
                        let id = msg["id"].as_str().unwrap_or_default();
                        live.retain(|(live_id, _, _)| live_id != id);
                    }
                    _ => {}
                }
            }
            changed = changes.recv() => {
                if changed.is_err() {
                    break;
                }
                for (id, operation, variables) in &live {
                    let result = fake.resolve(operation, variables);
                    let next = json!({ "id": id, "type": "next", "payload": result });
                    if sender.send(frame(next)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}
