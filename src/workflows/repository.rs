use crate::config::SubmitConfig;
use crate::errors::Result;
use crate::http::ServiceClient;
use crate::workflows::{build_payload, Workflow, WorkflowId};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, Span};

const WORKFLOWS_ENDPOINT: &str = "/api/workflows";
const WORKFLOWS_BY_CREATED_DATE_ENDPOINT: &str = "/api/workflows?$orderby=CreatedDate%20asc";

/// Workflow operations offered by the genomics service.
///
/// Errors from the transport and from JSON decoding are returned as-is;
/// retrying is the transport's job.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Sign storage grants, submit a new workflow and return it as created
    async fn submit(&self, config: &SubmitConfig) -> Result<Workflow>;

    async fn fetch(&self, id: WorkflowId) -> Result<Workflow>;

    /// All workflows, oldest first, in the order the service returns them
    async fn fetch_all(&self) -> Result<Vec<Workflow>>;

    /// Request cancellation. The service cancels asynchronously, so the
    /// returned workflow may still be queued, working or cancelling.
    async fn cancel(&self, id: WorkflowId) -> Result<Workflow>;
}

/// [`WorkflowRepository`] backed by the REST API
#[derive(Debug, Clone)]
pub struct WorkflowsClient {
    client: ServiceClient,
    span: Span,
}

impl WorkflowsClient {
    pub fn new(client: ServiceClient) -> Self {
        let span = client.span().clone();
        Self { client, span }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.client = self.client.with_span(span.clone());
        self.span = span;
        self
    }
}

fn workflow_endpoint(id: WorkflowId) -> String {
    format!("{WORKFLOWS_ENDPOINT}/{id}")
}

#[async_trait]
impl WorkflowRepository for WorkflowsClient {
    async fn submit(&self, config: &SubmitConfig) -> Result<Workflow> {
        let payload = build_payload(config, Utc::now())?;

        info!(
            parent: &self.span,
            description = %config.description,
            process = %config.process.name,
            "submit"
        );

        self.client.post_json(WORKFLOWS_ENDPOINT, &payload).await
    }

    async fn fetch(&self, id: WorkflowId) -> Result<Workflow> {
        info!(parent: &self.span, workflow_id = %id, "status");
        self.client.get_json(&workflow_endpoint(id)).await
    }

    async fn fetch_all(&self) -> Result<Vec<Workflow>> {
        info!(parent: &self.span, workflow_id = "*", "status");
        self.client.get_json(WORKFLOWS_BY_CREATED_DATE_ENDPOINT).await
    }

    async fn cancel(&self, id: WorkflowId) -> Result<Workflow> {
        info!(parent: &self.span, workflow_id = %id, "cancel");
        self.client.delete_json(&workflow_endpoint(id)).await
    }
}
