use std::{
    collections::HashMap,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};

use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::SEC_WEBSOCKET_PROTOCOL},
    },
};
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};

use super::{GraphQlErrorEntry, GraphQlRequest, GraphQlResponse};

const PROTOCOL: &str = "graphql-transport-ws";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type UpdateSink = mpsc::UnboundedSender<ChatResult<GraphQlResponse>>;

enum Command {
    Subscribe { id: String, request: GraphQlRequest, sink: UpdateSink },
    Complete { id: String },
}

#[derive(Deserialize)]
struct ServerFrame {
    #[serde(rename = "type")]
    kind: String,
    id: Option<String>,
    payload: Option<Value>,
}

/// One persistent `graphql-transport-ws` socket shared by every subscription.
///
/// Connects on first use. If the socket dies, live subscriptions get a final
/// error and the next `subscribe` dials a fresh connection.
pub struct WsLink {
    url: String,
    admin_secret: String,
    next_id: AtomicU64,
    driver: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

impl WsLink {
    pub fn new(url: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            admin_secret: admin_secret.into(),
            next_id: AtomicU64::new(1),
            driver: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn subscribe(&self, request: GraphQlRequest) -> ChatResult<Subscription> {
        let commands = self.connection().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let (sink, updates) = mpsc::unbounded_channel();

        commands
            .send(Command::Subscribe { id: id.clone(), request, sink })
            .map_err(|_| ChatError::Socket("connection closed".to_owned()))?;

        Ok(Subscription { id, updates, commands })
    }

    async fn connection(&self) -> ChatResult<mpsc::UnboundedSender<Command>> {
        let mut driver = self.driver.lock().await;
        if let Some(commands) = driver.as_ref().filter(|c| !c.is_closed()) {
            return Ok(commands.clone());
        }

        let socket = handshake(&self.url, &self.admin_secret).await?;
        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(drive(socket, inbox));

        *driver = Some(commands.clone());
        Ok(commands)
    }
}

/// Live results of one subscription. Dropping it completes the operation server side.
pub struct Subscription {
    id: String,
    updates: mpsc::UnboundedReceiver<ChatResult<GraphQlResponse>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Stream for Subscription {
    type Item = ChatResult<GraphQlResponse>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.updates.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        let _ = self.commands.send(Command::Complete { id });
    }
}

fn text(frame: Value) -> Message {
    Message::text(frame.to_string())
}

async fn handshake(url: &str, admin_secret: &str) -> ChatResult<Socket> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(PROTOCOL));

    let (mut socket, _) = connect_async(request).await?;
    socket
        .send(text(json!({
            "type": "connection_init",
            "payload": { "headers": { "x-hasura-admin-secret": admin_secret } }
        })))
        .await?;

    loop {
        match socket.next().await {
            Some(Ok(Message::Text(raw))) => {
                let frame: ServerFrame = serde_json::from_str(raw.as_str())?;
                match frame.kind.as_str() {
                    "connection_ack" => break,
                    "ping" => socket.send(text(json!({"type": "pong"}))).await?,
                    other => {
                        return Err(ChatError::Socket(format!(
                            "expected connection_ack, got {other}"
                        )));
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(ChatError::Socket("closed during handshake".to_owned()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }

    debug!(url, "graphql socket connected");
    Ok(socket)
}

async fn drive(socket: Socket, mut inbox: mpsc::UnboundedReceiver<Command>) {
    let (mut write, mut read) = socket.split();
    let mut active: HashMap<String, UpdateSink> = HashMap::new();

    let reason = loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(Command::Subscribe { id, request, sink }) => {
                    let frame = json!({ "id": id, "type": "subscribe", "payload": request });
                    if let Err(e) = write.send(text(frame)).await {
                        let _ = sink.send(Err(e.into()));
                        break "send failed".to_owned();
                    }
                    active.insert(id, sink);
                }
                Some(Command::Complete { id }) => {
                    if active.remove(&id).is_some() {
                        let _ = write.send(text(json!({ "id": id, "type": "complete" }))).await;
                    }
                }
                None => break "link dropped".to_owned(),
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(raw))) => {
                    let frame: ServerFrame = match serde_json::from_str(raw.as_str()) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "unreadable frame on graphql socket");
                            continue;
                        }
                    };
                    match (frame.kind.as_str(), frame.id) {
                        ("next", Some(id)) => {
                            if let Some(sink) = active.get(&id) {
                                let update = frame
                                    .payload
                                    .map(serde_json::from_value::<GraphQlResponse>)
                                    .unwrap_or_else(|| Ok(GraphQlResponse::default()))
                                    .map_err(ChatError::from);
                                let _ = sink.send(update);
                            }
                        }
                        ("error", Some(id)) => {
                            if let Some(sink) = active.remove(&id) {
                                let message = frame
                                    .payload
                                    .and_then(|p| serde_json::from_value::<Vec<GraphQlErrorEntry>>(p).ok())
                                    .and_then(|errors| errors.into_iter().next())
                                    .map_or_else(|| "subscription failed".to_owned(), |e| e.message);
                                let _ = sink.send(Err(ChatError::GraphQl(message)));
                            }
                        }
                        ("complete", Some(id)) => {
                            active.remove(&id);
                        }
                        ("ping", _) => {
                            let _ = write.send(text(json!({ "type": "pong" }))).await;
                        }
                        _ => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => break "closed by server".to_owned(),
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
            },
        }
    };

    debug!(%reason, live = active.len(), "graphql socket finished");
    for (_, sink) in active.drain() {
        let _ = sink.send(Err(ChatError::Socket(reason.clone())));
    }
}
