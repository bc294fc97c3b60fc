//! Debounced validation of pasted import text.
//!
//! [`ImportValidator`] runs a background task that parses candidate import
//! text only after the input has been quiet for the configured debounce
//! window. A submission arriving while another is pending supersedes it:
//! the pending text is dropped without being parsed and the window restarts.
//! Results are published on a `tokio::sync::watch` channel, so readers
//! always see the latest diagnostic.

use std::sync::atomic::{AtomicU64, Ordering};

use promptline_core::importer::{self, ImportDiagnostic};
use promptline_core::{Frame, PromptSet};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ImportValidatorConfig;
use crate::error::EventsError;

/// A completed validation, tagged with the submission it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedImport {
    pub generation: u64,
    pub diagnostic: ImportDiagnostic,
}

struct ImportRequest {
    generation: u64,
    text: String,
    last_frame: Frame,
    existing: PromptSet,
}

// ---------------------------------------------------------------------------
// ImportValidator
// ---------------------------------------------------------------------------

/// Handle to the background import validation task.
pub struct ImportValidator {
    requests: mpsc::UnboundedSender<ImportRequest>,
    results: watch::Receiver<Option<ValidatedImport>>,
    generation: AtomicU64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ImportValidator {
    /// Spawn the validation task on the current tokio runtime.
    pub fn spawn(config: ImportValidatorConfig) -> Self {
        let (requests, rx) = mpsc::unbounded_channel();
        let (tx, results) = watch::channel(None);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(rx, tx, config, cancel.clone()));

        Self {
            requests,
            results,
            generation: AtomicU64::new(0),
            cancel,
            handle,
        }
    }

    /// Queue text for validation against `existing`.
    ///
    /// Returns the generation number the eventual [`ValidatedImport`] will
    /// carry. Any earlier submission still waiting out the debounce window
    /// is superseded.
    pub fn submit(
        &self,
        text: impl Into<String>,
        last_frame: Frame,
        existing: &PromptSet,
    ) -> Result<u64, EventsError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.requests
            .send(ImportRequest {
                generation,
                text: text.into(),
                last_frame,
                existing: existing.clone(),
            })
            .map_err(|_| EventsError::ValidatorClosed)?;
        Ok(generation)
    }

    /// Receiver for validation results.
    pub fn subscribe(&self) -> watch::Receiver<Option<ValidatedImport>> {
        self.results.clone()
    }

    /// The most recent result, if any validation has completed.
    pub fn latest(&self) -> Option<ValidatedImport> {
        self.results.borrow().clone()
    }

    /// Stop the task, dropping any pending submission.
    pub async fn shutdown(self) -> Result<(), EventsError> {
        self.cancel.cancel();
        self.handle.await?;
        Ok(())
    }
}

async fn run(
    mut requests: mpsc::UnboundedReceiver<ImportRequest>,
    results: watch::Sender<Option<ValidatedImport>>,
    config: ImportValidatorConfig,
    cancel: CancellationToken,
) {
    let mut pending: Option<ImportRequest> = None;
    let deadline = tokio::time::sleep(config.debounce);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Import validator cancelled");
                break;
            }
            request = requests.recv() => {
                let Some(request) = request else {
                    tracing::debug!("Import validator handle dropped");
                    break;
                };
                tracing::trace!(generation = request.generation, "Scheduled import validation");
                if let Some(superseded) = pending.replace(request) {
                    tracing::debug!(
                        generation = superseded.generation,
                        "Superseded pending import validation"
                    );
                }
                deadline.as_mut().reset(Instant::now() + config.debounce);
            }
            _ = &mut deadline, if pending.is_some() => {
                if let Some(request) = pending.take() {
                    let diagnostic =
                        importer::parse(&request.text, request.last_frame, &request.existing);
                    tracing::debug!(
                        generation = request.generation,
                        level = ?diagnostic.level,
                        count = diagnostic.parsed_prompts.len(),
                        "Import validation completed"
                    );
                    results.send_replace(Some(ValidatedImport {
                        generation: request.generation,
                        diagnostic,
                    }));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use promptline_core::importer::DiagnosticLevel;

    fn validator() -> ImportValidator {
        ImportValidator::spawn(ImportValidatorConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn validates_after_quiet_period() {
        let validator = validator();
        let mut rx = validator.subscribe();
        let existing = PromptSet::default_for(10);

        let start = Instant::now();
        let generation = validator.submit("red\nblue", 10, &existing).unwrap();
        rx.changed().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(250));
        let result = validator.latest().unwrap();
        assert_eq!(result.generation, generation);
        assert_eq!(result.diagnostic.level, DiagnosticLevel::Info);
        assert_eq!(result.diagnostic.parsed_prompts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_submission_supersedes_pending_one() {
        let validator = validator();
        let mut rx = validator.subscribe();
        let existing = PromptSet::default_for(10);

        validator.submit("{ broken", 10, &existing).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = validator.submit("red", 10, &existing).unwrap();
        let resubmitted_at = Instant::now();

        rx.changed().await.unwrap();
        assert!(resubmitted_at.elapsed() >= Duration::from_millis(250));
        let result = rx.borrow_and_update().clone().unwrap();
        assert_eq!(result.generation, second);
        assert!(!result.diagnostic.is_error());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_published_before_first_submission() {
        let validator = validator();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(validator.latest().is_none());
    }

    #[tokio::test]
    async fn requests_are_refused_after_shutdown() {
        let validator = validator();
        let requests = validator.requests.clone();
        validator.shutdown().await.unwrap();

        let closed = requests.send(ImportRequest {
            generation: 1,
            text: String::new(),
            last_frame: 0,
            existing: PromptSet::default_for(0),
        });
        assert!(closed.is_err());
    }
}
