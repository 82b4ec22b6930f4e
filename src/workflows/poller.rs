use crate::errors::{MsgenError, Result};
use crate::workflows::{Workflow, WorkflowId, WorkflowRepository, WorkflowStatus};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Span};

/// How long and how often to poll.
///
/// Without `max_attempts` or `max_duration` polling never gives up on its
/// own; the operator decides when to stop waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_duration: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_attempts: None,
            max_duration: None,
        }
    }
}

impl WaitOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }
}

/// Polls a workflow until it reaches a terminal status
pub struct Poller<'a, R: WorkflowRepository + ?Sized> {
    repository: &'a R,
    options: WaitOptions,
    cancellation: Option<CancellationToken>,
    span: Span,
}

impl<'a, R: WorkflowRepository + ?Sized> Poller<'a, R> {
    pub fn new(repository: &'a R, options: WaitOptions) -> Self {
        Self {
            repository,
            options,
            cancellation: None,
            span: Span::current(),
        }
    }

    /// Stop waiting, with [`MsgenError::WaitCancelled`], once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetch `id` every interval until it succeeds, fails or is cancelled.
    ///
    /// Success returns the final workflow. Failed and cancelled workflows are
    /// reported as [`MsgenError::WorkflowUnsuccessful`]. Fetch errors end the
    /// wait immediately.
    pub async fn wait_until_done(&self, id: WorkflowId) -> Result<Workflow> {
        let started = Instant::now();
        let mut attempts: u32 = 0;
        let mut previous: Option<WorkflowStatus> = None;

        loop {
            if self.is_cancelled() {
                return Err(MsgenError::WaitCancelled(id));
            }

            let workflow = self.repository.fetch(id).await?;
            attempts += 1;

            info!(
                parent: &self.span,
                workflow_id = %id,
                status = %workflow.status,
                code = workflow.status.code(),
                message = %workflow.message,
                attempt = attempts,
                "wait"
            );

            if let Some(previous) = previous {
                if !previous.can_transition_to(workflow.status) {
                    warn!(
                        parent: &self.span,
                        workflow_id = %id,
                        from = %previous,
                        to = %workflow.status,
                        "Unexpected workflow status transition"
                    );
                }
            }
            previous = Some(workflow.status);

            if workflow.status == WorkflowStatus::Success {
                return Ok(workflow);
            }
            if workflow.status.is_unsuccessful() {
                return Err(MsgenError::WorkflowUnsuccessful {
                    id,
                    status: workflow.status,
                    message: workflow.message,
                });
            }

            if let Some(max_attempts) = self.options.max_attempts {
                if attempts >= max_attempts {
                    return Err(self.limit_exceeded(id, attempts, started));
                }
            }

            let delay = match self.options.max_duration {
                Some(max_duration) => {
                    let elapsed = started.elapsed();
                    if elapsed >= max_duration {
                        return Err(self.limit_exceeded(id, attempts, started));
                    }
                    self.options.interval.min(max_duration - elapsed)
                }
                None => self.options.interval,
            };

            self.sleep(id, delay).await?;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn limit_exceeded(&self, id: WorkflowId, attempts: u32, started: Instant) -> MsgenError {
        MsgenError::WaitLimitExceeded {
            id,
            attempts,
            elapsed: started.elapsed(),
        }
    }

    async fn sleep(&self, id: WorkflowId, delay: Duration) -> Result<()> {
        match &self.cancellation {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(MsgenError::WaitCancelled(id)),
                    _ = tokio::time::sleep(delay) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}
