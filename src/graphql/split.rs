use futures_util::StreamExt;

use crate::error::{ChatError, ChatResult};

use super::{GraphQlRequest, GraphQlResponse, HttpTransport, OperationKind, Subscription, Transport, WsLink};

/// Sends subscriptions down the socket link and everything else over HTTP.
pub struct SplitTransport {
    http: HttpTransport,
    ws: WsLink,
}

impl SplitTransport {
    pub fn new(http: HttpTransport, ws: WsLink) -> Self {
        Self { http, ws }
    }

    pub fn http(&self) -> &HttpTransport {
        &self.http
    }

    pub async fn subscribe(&self, request: GraphQlRequest) -> ChatResult<Subscription> {
        if request.kind() != OperationKind::Subscription {
            return Err(ChatError::validation(format!(
                "{} is not a subscription",
                request.operation_name
            )));
        }
        self.ws.subscribe(request).await
    }
}

impl Transport for SplitTransport {
    async fn execute(&self, request: GraphQlRequest) -> ChatResult<GraphQlResponse> {
        match request.kind() {
            // one-shot use of a subscription: first pushed result, then complete
            OperationKind::Subscription => {
                let mut subscription = self.ws.subscribe(request).await?;
                subscription
                    .next()
                    .await
                    .unwrap_or_else(|| Err(ChatError::Socket("subscription ended without data".to_owned())))
            }
            OperationKind::Query | OperationKind::Mutation => self.http.execute(request).await,
        }
    }
}
