mod http;
pub mod ops;
mod split;
mod ws;

use std::future::Future;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{ChatError, ChatResult};

pub use http::HttpTransport;
pub use split::SplitTransport;
pub use ws::{Subscription, WsLink};

pub const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

/// Body of a GraphQL POST: a document, which operation in it to run, and its variables.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    pub operation_name: String,
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn new(query: &str, operation_name: &str, variables: Value) -> Self {
        Self {
            query: query.to_owned(),
            operation_name: operation_name.to_owned(),
            variables,
        }
    }

    pub fn kind(&self) -> OperationKind {
        operation_kind(&self.query, Some(&self.operation_name))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GraphQlErrorEntry {
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlErrorEntry>>,
}

impl GraphQlResponse {
    pub fn from_data(data: Value) -> Self {
        Self { data: Some(data), errors: None }
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors.as_ref()?.first().map(|e| e.message.as_str())
    }

    /// Turns an `errors` array into its first message, otherwise decodes `data` as `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> ChatResult<T> {
        if let Some(message) = self.first_error() {
            return Err(ChatError::GraphQl(message.to_owned()));
        }
        Ok(serde_json::from_value(self.data.unwrap_or(Value::Null))?)
    }
}

/// Anything that can run a GraphQL operation and hand back `{data, errors}`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: GraphQlRequest)
        -> impl Future<Output = ChatResult<GraphQlResponse>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn execute(&self, request: GraphQlRequest)
        -> impl Future<Output = ChatResult<GraphQlResponse>> + Send {
        (**self).execute(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// Finds the root kind of the named operation in `document`.
///
/// With no name, the first operation wins. A bare selection set (`{ ... }`)
/// is shorthand for a query, and so is anything we fail to recognise.
pub fn operation_kind(document: &str, operation_name: Option<&str>) -> OperationKind {
    let mut depth = 0usize;
    let mut tokens = Tokens::new(document);

    while let Some(token) = tokens.next() {
        match token {
            "{" => {
                if depth == 0 && operation_name.is_none() {
                    return OperationKind::Query;
                }
                depth += 1;
            }
            "}" => depth = depth.saturating_sub(1),
            "query" | "mutation" | "subscription" if depth == 0 => {
                let kind = match token {
                    "mutation" => OperationKind::Mutation,
                    "subscription" => OperationKind::Subscription,
                    _ => OperationKind::Query,
                };
                let name = tokens.peek();
                match operation_name {
                    None => return kind,
                    Some(wanted) if name == Some(wanted) => return kind,
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }

    OperationKind::Query
}

/// Just enough of a GraphQL lexer to walk top-level definitions.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(source: &'a str) -> Self {
        Self { rest: source }
    }

    fn skip_ignored(&mut self) {
        loop {
            let trimmed = self.rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
            if let Some(comment) = trimmed.strip_prefix('#') {
                self.rest = comment.find('\n').map_or("", |end| &comment[end..]);
            } else {
                self.rest = trimmed;
                return;
            }
        }
    }

    fn peek(&mut self) -> Option<&'a str> {
        let saved = self.rest;
        let token = self.next();
        self.rest = saved;
        token
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.skip_ignored();
        let first = self.rest.chars().next()?;

        let len = if first.is_alphanumeric() || first == '_' {
            self.rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(self.rest.len())
        } else if first == '"' {
            // strings may hold braces; swallow them whole
            let body = &self.rest[1..];
            body.find('"').map_or(self.rest.len(), |end| end + 2)
        } else {
            first.len_utf8()
        };

        let (token, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(token)
    }
}
