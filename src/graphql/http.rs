use reqwest::{Client, header};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

use super::{ADMIN_SECRET_HEADER, GraphQlRequest, GraphQlResponse, Transport};

/// POSTs operations to a single GraphQL endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    admin_secret: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint, admin_secret)
    }

    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        admin_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            admin_secret: admin_secret.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: GraphQlRequest) -> ChatResult<GraphQlResponse> {
        debug!(operation = %request.operation_name, "graphql http request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(ADMIN_SECRET_HEADER, &self.admin_secret)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GraphQlResponse>(&body)
                .ok()
                .and_then(|r| r.first_error().map(str::to_owned))
                .unwrap_or_else(|| "Network error".to_owned());
            return Err(ChatError::Rejected(message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
