use axum::{
    debug_handler,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    Graphql, Settings,
    config::ChatSync,
    session::{CurrentUser, SessionUser},
};

use super::{ChatView, RoomFeed, send_message, view::Frame};

#[derive(Deserialize)]
pub(crate) struct SendMessageQuery {
    content: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<Uuid>,
    State(graphql): State<Graphql>,
    State(settings): State<Settings>,
    CurrentUser { user, .. }: CurrentUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| chat_view(socket, graphql, settings, user, room_id))
}

/// Lives exactly as long as the socket: one feed, disposed on the way out.
/// The session is checked when the socket opens; a later logout ends the
/// view when the page is reloaded.
async fn chat_view(
    socket: WebSocket,
    graphql: Graphql,
    settings: Settings,
    user: SessionUser,
    room_id: Uuid,
) {
    let mut feed = match settings.chat_sync {
        ChatSync::Poll => RoomFeed::polling(graphql.clone(), room_id, settings.poll_interval),
        ChatSync::Subscribe => RoomFeed::subscription(graphql.clone(), room_id, settings.poll_interval),
    };
    let refresh = feed.refresher();
    let mut view = ChatView::new(room_id);
    let (mut sender, mut receiver) = socket.split();
    let mut last_html = String::new();

    debug!(%room_id, user_id = %user.id, "chat view opened");

    loop {
        tokio::select! {
            update = feed.next() => {
                let Some(update) = update else {
                    break;
                };
                view.apply(update);
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(raw))) => {
                    let Ok(SendMessageQuery { content }) = serde_json::from_str(raw.as_str()) else {
                        continue;
                    };
                    match send_message(graphql.as_ref(), &user, room_id, &content).await {
                        Ok(outcome) => {
                            if view.apply_sent(outcome) {
                                refresh.notify_one();
                            }
                        }
                        Err(e) => {
                            warn!(%room_id, error = %e, "send failed");
                            view.fail(&e);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        }

        if push(&mut sender, &view, &mut last_html).await.is_err() {
            break;
        }
    }

    feed.dispose();
    debug!(%room_id, "chat view closed");
}

/// Sends the current frame; unchanged message lists are not resent.
async fn push(
    sender: &mut SplitSink<WebSocket, Message>,
    view: &ChatView,
    last_html: &mut String,
) -> Result<(), axum::Error> {
    let frame = view.frame();
    match &frame {
        Frame::Messages { html, .. } if *html == *last_html => return Ok(()),
        Frame::Messages { html, .. } => last_html.clone_from(html),
        // the page drops its banner on the next message list, so make sure one comes
        Frame::Error { .. } => last_html.clear(),
    }

    let text = serde_json::to_string(&frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
