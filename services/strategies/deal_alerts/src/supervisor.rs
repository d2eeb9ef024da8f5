//! Supervision of the long-running components
//!
//! Every component runs as its own task under a shared cancellation token.
//! The first failure is reported to the operator channel and stops the rest.
//! Topic consumers are not dropped on cancel; they end once their source
//! closes, so in-flight messages finish.

use config::log_critical;
use message_sink::NotificationSink;
use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{component} failed: {message}")]
pub struct ComponentFailure {
    pub component: &'static str,
    pub message: String,
}

type Exit = (&'static str, Result<(), String>);

pub struct Supervisor {
    tasks: JoinSet<Exit>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    /// Token components should watch for a graceful stop
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run `work` until it finishes or the supervisor is cancelled
    pub fn spawn<F, E>(&mut self, component: &'static str, work: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Ok(()),
                result = work => result.map_err(|e| e.to_string()),
            };
            (component, result)
        });
    }

    /// Run `work` to completion; it must end on its own once the supervisor is cancelled
    pub fn spawn_until_closed<F, E>(&mut self, component: &'static str, work: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tasks
            .spawn(async move { (component, work.await.map_err(|e| e.to_string())) });
    }

    /// Wait for every component; the first failure is reported and cancels the rest
    pub async fn wait(mut self, operator: &dyn NotificationSink) -> Result<(), ComponentFailure> {
        let mut failure: Option<ComponentFailure> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let (component, result) = match joined {
                Ok(exit) => exit,
                Err(e) => ("component task", Err(format!("task aborted: {}", e))),
            };

            let message = match result {
                Ok(()) => {
                    info!("{} stopped", component);
                    continue;
                }
                Err(message) => message,
            };
            if failure.is_some() || self.cancel.is_cancelled() {
                error!("{} failed during shutdown: {}", component, message);
                continue;
            }

            log_critical!("Error fatal, kill process | {}: {}", component, message);
            if let Err(e) = operator.send_admin_error(component, &message).await {
                error!("Failed to report {} failure to operators: {}", component, e);
            }
            failure = Some(ComponentFailure { component, message });
            self.cancel.cancel();
        }

        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use message_sink::test_utils::RecordingNotifier;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_failure_is_reported_and_stops_others() {
        let mut supervisor = Supervisor::new(CancellationToken::new());
        let token = supervisor.token();

        supervisor.spawn("forever", async move {
            token.cancelled().await;
            Ok::<(), String>(())
        });
        supervisor.spawn("stuck", std::future::pending::<Result<(), String>>());
        supervisor.spawn("token finder", async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<(), _>("Bearer token not found in page")
        });
        assert_eq!(supervisor.len(), 3);

        let operator = RecordingNotifier::new();
        let failure = supervisor.wait(&operator).await.unwrap_err();

        assert_eq!(failure.component, "token finder");
        assert_eq!(
            operator.admin_errors(),
            vec![("token finder".to_string(), "Bearer token not found in page".to_string())]
        );
    }

    #[tokio::test]
    async fn test_draining_component_finishes_after_cancel() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let token = supervisor.token();
        supervisor.spawn_until_closed("calendar consumer", async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            done_tx.send(()).map_err(|_| "receiver gone")
        });
        // Shutdown noise from a component that lost its source
        let token = supervisor.token();
        supervisor.spawn_until_closed("scrape scheduler", async move {
            token.cancelled().await;
            Err::<(), _>("topic closed")
        });

        cancel.cancel();
        let operator = RecordingNotifier::new();
        supervisor.wait(&operator).await.unwrap();
        done_rx.await.unwrap();
        assert!(operator.admin_errors().is_empty());
    }

    #[tokio::test]
    async fn test_external_cancel_is_clean() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        supervisor.spawn("stuck", std::future::pending::<Result<(), String>>());

        cancel.cancel();
        let operator = RecordingNotifier::new();
        supervisor.wait(&operator).await.unwrap();
        assert!(operator.admin_errors().is_empty());
    }
}
