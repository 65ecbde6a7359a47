use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{Todo, TodoId},
    error::ApiError,
    protocol::{MutationRequest, MutationResponse, RPC_ROUTE, TODOS_ROUTE},
};
use tracing::debug;
use url::Url;

use crate::error::GatewayError;

/// Create/update operations against persistent storage.
///
/// Each call either fully applies (refreshing `updated_at`) or has no effect.
#[async_trait]
pub trait MutationGateway: Send + Sync {
    async fn create_todo(&self, title: &str) -> Result<Todo, GatewayError>;
    async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        version: Option<u64>,
    ) -> Result<Todo, GatewayError>;
    async fn list_todos(&self) -> Result<Vec<Todo>, GatewayError>;
}

/// Speaks the `/rpc` contract of the todo server.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(server_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("server url '{server_url}' cannot be used as a base"));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|e| GatewayError::Transport(format!("invalid endpoint '{route}': {e}")))
    }

    async fn call(&self, request: &MutationRequest) -> Result<Todo, GatewayError> {
        debug!(method = request.method(), "sending mutation");
        let response = self
            .http
            .post(self.endpoint(RPC_ROUTE)?)
            .json(request)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(response.json::<MutationResponse>().await?);
        }
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    match response.json::<ApiError>().await {
        Ok(api_error) => api_error.into(),
        Err(_) => GatewayError::Transport(format!("unexpected status {status}")),
    }
}

#[async_trait]
impl MutationGateway for HttpGateway {
    async fn create_todo(&self, title: &str) -> Result<Todo, GatewayError> {
        self.call(&MutationRequest::CreateTodo {
            title: title.to_string(),
        })
        .await
    }

    async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        version: Option<u64>,
    ) -> Result<Todo, GatewayError> {
        self.call(&MutationRequest::SetCompleted {
            id,
            completed,
            version,
        })
        .await
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, GatewayError> {
        let response = self.http.get(self.endpoint(TODOS_ROUTE)?).send().await?;
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        Err(error_from_response(response).await)
    }
}
