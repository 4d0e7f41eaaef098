use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::ChatError,
    graphql::{SplitTransport, Transport},
};

use super::{RoomUpdate, decode_room, fetch_room, room_request};

/// Background refresher bound to one open chat view.
///
/// Dropping the feed (or calling [`RoomFeed::dispose`]) aborts its task and
/// drops the receiving end, so nothing is fetched or delivered afterwards.
pub struct RoomFeed {
    task: JoinHandle<()>,
    updates: mpsc::Receiver<RoomUpdate>,
    refresh: Arc<Notify>,
}

impl RoomFeed {
    /// Fetches now, then every `every`. Failures are delivered and the loop carries on.
    pub fn polling<T: Transport + 'static>(transport: Arc<T>, room_id: Uuid, every: Duration) -> Self {
        let (tx, updates) = mpsc::channel(8);
        let refresh = Arc::new(Notify::new());
        let kick = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = kick.notified() => ticker.reset(),
                }

                debug!(%room_id, "polling room");
                let update = fetch_room(transport.as_ref(), room_id).await;
                if let Err(e) = &update {
                    warn!(%room_id, error = %e, "room refresh failed");
                }
                if tx.send(update).await.is_err() {
                    break;
                }
            }
        });

        Self { task, updates, refresh }
    }

    /// Live updates over the socket link. If the subscription dies, the error
    /// is delivered and a new one is opened after `retry`.
    pub fn subscription(transport: Arc<SplitTransport>, room_id: Uuid, retry: Duration) -> Self {
        let (tx, updates) = mpsc::channel(8);

        let task = tokio::spawn(async move {
            loop {
                match transport.subscribe(room_request("RoomFeed", room_id)).await {
                    Ok(mut live) => {
                        debug!(%room_id, "room subscription open");
                        while let Some(pushed) = live.next().await {
                            if tx.send(pushed.and_then(decode_room)).await.is_err() {
                                return;
                            }
                        }
                        if tx
                            .send(Err(ChatError::Socket("live updates stopped".to_owned())))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(%room_id, error = %e, "room subscription failed");
                        if tx.send(Err(e)).await.is_err() {
                            return;
                        }
                    }
                }
                time::sleep(retry).await;
            }
        });

        // pushes arrive on their own; a refresh request has nothing to do
        Self { task, updates, refresh: Arc::new(Notify::new()) }
    }

    pub async fn next(&mut self) -> Option<RoomUpdate> {
        self.updates.recv().await
    }

    /// Handle that asks the loop for an immediate fetch.
    pub fn refresher(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for RoomFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
