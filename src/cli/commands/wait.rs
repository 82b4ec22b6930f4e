use crate::workflows::{Poller, WaitOptions, Workflow, WorkflowId, WorkflowRepository};
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::Span;

/// Block until a workflow finishes; only success is `Ok`
pub struct WaitCommand<'a, R: WorkflowRepository + ?Sized> {
    repository: &'a R,
    workflow_id: WorkflowId,
    options: WaitOptions,
    cancellation: CancellationToken,
}

impl<'a, R: WorkflowRepository + ?Sized> WaitCommand<'a, R> {
    pub fn new(repository: &'a R, workflow_id: WorkflowId, options: WaitOptions) -> Self {
        Self {
            repository,
            workflow_id,
            options,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub async fn execute(&self) -> Result<Workflow> {
        let workflow = Poller::new(self.repository, self.options.clone())
            .with_cancellation(self.cancellation.clone())
            .with_span(Span::current())
            .wait_until_done(self.workflow_id)
            .await?;

        Ok(workflow)
    }
}
