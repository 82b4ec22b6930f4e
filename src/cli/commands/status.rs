use crate::cli::output::{write_workflow, write_workflows};
use crate::workflows::{WorkflowId, WorkflowRepository};
use anyhow::Result;
use chrono::Utc;
use std::io::Write;

/// Print one workflow, or all of them when no ID is given
pub struct StatusCommand<'a, R: WorkflowRepository + ?Sized> {
    repository: &'a R,
    workflow_id: Option<WorkflowId>,
}

impl<'a, R: WorkflowRepository + ?Sized> StatusCommand<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self {
            repository,
            workflow_id: None,
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: Option<WorkflowId>) -> Self {
        self.workflow_id = workflow_id;
        self
    }

    pub async fn execute<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.workflow_id {
            Some(id) => {
                let workflow = self.repository.fetch(id).await?;
                write_workflow(out, &workflow, Utc::now())?;
            }
            None => {
                let workflows = self.repository.fetch_all().await?;
                write_workflows(out, &workflows, Utc::now())?;
            }
        }
        Ok(())
    }
}
