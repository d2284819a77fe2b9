//! GraphQL API client

use std::sync::Arc;

use reqwest::header::InvalidHeaderValue;
use reqwest::{Request, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};


mod auth;

pub use auth::AuthStage;

use crate::storage::{self, TokenStorage};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot read the stored token")]
    Storage(#[from] storage::Error),
    #[error("Stored token is not a valid header value")]
    InvalidToken(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Transformation applied to every request before it is sent
pub trait RequestStage: Send + Sync {
    fn apply(&self, request: &mut Request) -> Result<(), Error>;
}

/// GraphQL operation to execute
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub query: String,
    pub variables: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl Operation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Object(Default::default()),
            operation_name: None,
        }
    }

    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// GraphQL response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLResponse {
    /// GraphQL data, `null` if the operation failed entirely
    #[serde(default)]
    pub data: Value,
    /// GraphQL errors
    pub errors: Option<Vec<Value>>,
}

/// Client sending GraphQL operations to the API endpoint
///
/// Every request goes through all the stages in order, and then is sent to the transport. Transport
/// failures are returned as they are, there are no retries.
#[derive(Clone)]
pub struct ApiClient {
    endpoint: Url,
    http: reqwest::Client,
    stages: Vec<Arc<dyn RequestStage>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl ApiClient {
    /// Client without any stages
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
            stages: Vec::new(),
        }
    }

    /// Appends the stage to the pipeline
    pub fn with_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the request for the operation passing it through all the stages
    pub fn request(&self, operation: &Operation) -> Result<Request, Error> {
        let mut request = self.http.post(self.endpoint.clone()).json(operation).build()?;
        for stage in &self.stages {
            stage.apply(&mut request)?;
        }

        Ok(request)
    }

    /// Executes the GraphQL operation
    #[instrument(skip_all, fields(endpoint = %self.endpoint, operation = ?operation.operation_name))]
    pub async fn execute(&self, operation: &Operation) -> Result<GraphQLResponse, Error> {
        let request = self.request(operation)?;
        let response = self.http.execute(request).await?;
        debug!(status = %response.status(), "Response received");

        response.json().await.map_err(Into::into)
    }
}

/// Creates the API client authorizing requests with the stored token
pub fn bootstrap(endpoint: Url, storage: Arc<dyn TokenStorage>) -> ApiClient {
    ApiClient::new(endpoint).with_stage(AuthStage::new(storage))
}
