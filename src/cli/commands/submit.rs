use crate::config::SubmitConfig;
use crate::workflows::{Workflow, WorkflowRepository};
use anyhow::Result;
use std::io::Write;

/// Submit a workflow and print the ID the service assigned
pub struct SubmitCommand<'a, R: WorkflowRepository + ?Sized> {
    repository: &'a R,
    config: SubmitConfig,
}

impl<'a, R: WorkflowRepository + ?Sized> SubmitCommand<'a, R> {
    pub fn new(repository: &'a R, config: SubmitConfig) -> Self {
        Self { repository, config }
    }

    pub async fn execute<W: Write>(&self, out: &mut W) -> Result<Workflow> {
        let workflow = self.repository.submit(&self.config).await?;
        writeln!(out, "{}", workflow.id)?;
        Ok(workflow)
    }
}
