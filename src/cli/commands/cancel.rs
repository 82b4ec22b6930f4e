use crate::cli::output::write_workflow;
use crate::workflows::{WorkflowId, WorkflowRepository};
use anyhow::Result;
use chrono::Utc;
use std::io::Write;

/// Request cancellation and print the workflow as the service reports it
pub struct CancelCommand<'a, R: WorkflowRepository + ?Sized> {
    repository: &'a R,
    workflow_id: WorkflowId,
}

impl<'a, R: WorkflowRepository + ?Sized> CancelCommand<'a, R> {
    pub fn new(repository: &'a R, workflow_id: WorkflowId) -> Self {
        Self {
            repository,
            workflow_id,
        }
    }

    pub async fn execute<W: Write>(&self, out: &mut W) -> Result<()> {
        let workflow = self.repository.cancel(self.workflow_id).await?;
        write_workflow(out, &workflow, Utc::now())?;
        Ok(())
    }
}
