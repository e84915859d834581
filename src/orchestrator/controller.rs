//! Workflow state machine.
//!
//! Owns the current view state, the single live preview and the single in-flight
//! classification, and emits events for presentation layers. Handlers run to completion;
//! awaiting the classification is the only suspension point.

use crate::engine::{CancelFlag, ClassificationError, Classifier};
use crate::model::{
    ClassificationResult, ImageSubmission, Notification, PreviewUri, SelectedFile, WorkflowConfig,
    WorkflowEvent, WorkflowPhase, WorkflowSnapshot,
};
use crate::preview::{PreviewHandle, PreviewManager};
use crate::validate::{validate_with_limit, ValidationError};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub(crate) type ClassificationOutcome = Result<ClassificationResult, ClassificationError>;

/// Commands emitted by UI layers to drive the workflow.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(SelectedFile),
    Reset,
    Abandon,
    Quit,
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Admission {
    Admitted,
    /// A classification is already in flight; the file was dropped unseen.
    Ignored,
    Rejected(ValidationError),
}

enum WorkflowState {
    Idle,
    Analyzing {
        submission: Arc<ImageSubmission>,
        preview: PreviewUri,
    },
    Result {
        result: ClassificationResult,
        file_name: String,
        preview: PreviewUri,
    },
}

/// Internal handle for the running classification task.
struct InFlight {
    cancel: CancelFlag,
    handle: JoinHandle<ClassificationOutcome>,
}

pub(crate) struct WorkflowController {
    state: WorkflowState,
    previews: PreviewManager,
    classifier: Arc<dyn Classifier>,
    max_upload_bytes: u64,
    classify_timeout: Duration,
    event_tx: UnboundedSender<WorkflowEvent>,
    in_flight: Option<InFlight>,
}

impl WorkflowController {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        cfg: &WorkflowConfig,
        event_tx: UnboundedSender<WorkflowEvent>,
    ) -> Self {
        log::info!("workflow ready (classifier: {})", classifier.name());
        Self {
            state: WorkflowState::Idle,
            previews: PreviewManager::new(),
            classifier,
            max_upload_bytes: cfg.max_upload_bytes,
            classify_timeout: cfg.classify_timeout,
            event_tx,
            in_flight: None,
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        match self.state {
            WorkflowState::Idle => WorkflowPhase::Idle,
            WorkflowState::Analyzing { .. } => WorkflowPhase::Analyzing,
            WorkflowState::Result { .. } => WorkflowPhase::Result,
        }
    }

    #[cfg(test)]
    pub fn previews(&self) -> &PreviewManager {
        &self.previews
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        match &self.state {
            WorkflowState::Idle => WorkflowSnapshot::idle(),
            WorkflowState::Analyzing {
                submission,
                preview,
            } => WorkflowSnapshot {
                phase: WorkflowPhase::Analyzing,
                file_name: Some(submission.name.clone()),
                preview: self.previews.resolve(preview).map(PreviewHandle::info),
                result: None,
            },
            WorkflowState::Result {
                result,
                file_name,
                preview,
            } => WorkflowSnapshot {
                phase: WorkflowPhase::Result,
                file_name: Some(file_name.clone()),
                preview: self.previews.resolve(preview).map(PreviewHandle::info),
                result: Some(result.clone()),
            },
        }
    }

    fn notify(&self, n: Notification) {
        let _ = self.event_tx.send(WorkflowEvent::Notify(n));
    }

    fn transition(&mut self, next: WorkflowState) {
        self.state = next;
        log::info!("workflow -> {:?}", self.phase());
        let _ = self
            .event_tx
            .send(WorkflowEvent::StateChanged(Box::new(self.snapshot())));
    }

    /// Offer a file to the workflow.
    ///
    /// Ignored while analyzing. Otherwise the file is validated; on success the previous
    /// preview (if any) is replaced and a classification is started.
    pub fn submit(&mut self, file: SelectedFile) -> Admission {
        if matches!(self.state, WorkflowState::Analyzing { .. }) {
            log::debug!("submission of {} ignored: analysis in progress", file.name);
            return Admission::Ignored;
        }

        let submission = match validate_with_limit(file, self.max_upload_bytes) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                log::warn!("submission rejected: {e}");
                self.notify(Notification::error(e.title(), e.user_message()));
                return Admission::Rejected(e);
            }
        };

        let preview = self.previews.acquire(&submission);
        self.transition(WorkflowState::Analyzing {
            submission: submission.clone(),
            preview,
        });
        self.notify(Notification::info(
            "Processing image",
            format!("Analyzing {}…", submission.name),
        ));
        self.in_flight = Some(self.spawn_classification(submission));
        Admission::Admitted
    }

    fn spawn_classification(&self, submission: Arc<ImageSubmission>) -> InFlight {
        let cancel = CancelFlag::new();
        let task_cancel = cancel.clone();
        let classifier = self.classifier.clone();
        let limit = self.classify_timeout;
        let handle = tokio::spawn(async move {
            match tokio::time::timeout(limit, classifier.classify(submission, task_cancel.clone()))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    task_cancel.cancel();
                    Err(ClassificationError::Timeout(limit))
                }
            }
        });
        InFlight { cancel, handle }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Wait for the in-flight classification. Pending forever when nothing is in flight.
    ///
    /// Cancel-safe: the task handle is only taken once it has completed, so dropping this
    /// future (e.g. a losing `select!` branch) never loses the outcome.
    pub async fn next_outcome(&mut self) -> ClassificationOutcome {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return futures::future::pending().await;
        };
        let joined = (&mut in_flight.handle).await;
        self.in_flight = None;
        match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(ClassificationError::Transport(format!(
                "classification task failed: {e}"
            ))),
        }
    }

    /// Apply the outcome of the classification started by the last admitted submission.
    pub fn complete(&mut self, outcome: ClassificationOutcome) {
        let WorkflowState::Analyzing {
            submission,
            preview,
        } = &self.state
        else {
            log::debug!("classification outcome discarded: not analyzing");
            return;
        };
        let file_name = submission.name.clone();
        let preview = preview.clone();

        match outcome {
            Ok(result) => {
                let message = format!(
                    "Classified as {} with {}% confidence",
                    result.subject_type, result.confidence
                );
                self.transition(WorkflowState::Result {
                    result,
                    file_name,
                    preview,
                });
                self.notify(Notification::success("Analysis complete!", message));
            }
            Err(e) => {
                log::warn!("classification of {file_name} failed: {e}");
                self.previews.release();
                self.transition(WorkflowState::Idle);
                self.notify(Notification::error(
                    "Analysis failed",
                    "There was an error processing your image. Please try again.",
                ));
            }
        }
    }

    /// Leave the result view. Returns whether anything changed.
    pub fn reset(&mut self) -> bool {
        match self.state {
            WorkflowState::Result { .. } => {
                self.previews.release();
                self.transition(WorkflowState::Idle);
                true
            }
            WorkflowState::Idle => false,
            WorkflowState::Analyzing { .. } => {
                log::debug!("reset ignored: analysis in progress");
                false
            }
        }
    }

    /// Give up on the in-flight classification. Returns whether anything changed.
    pub fn abandon(&mut self) -> bool {
        if !matches!(self.state, WorkflowState::Analyzing { .. }) {
            return false;
        }
        self.cancel_in_flight();
        self.previews.release();
        self.transition(WorkflowState::Idle);
        self.notify(Notification::info(
            "Analysis cancelled",
            "The image was discarded. Choose another photo to try again.",
        ));
        true
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
            in_flight.handle.abort();
        }
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        // In Tokio, dropping a JoinHandle does not cancel the task.
        self.cancel_in_flight();
        let ledger = self.previews.ledger();
        log::debug!(
            "workflow closed: {} previews acquired, {} released",
            ledger.acquired(),
            ledger.released()
        );
    }
}

/// Drive the workflow from UI commands until `Quit` or the command channel closes.
pub(crate) async fn run_workflow(
    mut controller: WorkflowController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let _ = controller
        .event_tx
        .send(WorkflowEvent::StateChanged(Box::new(controller.snapshot())));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(file)) => {
                        controller.submit(file);
                    }
                    Some(UiCommand::Reset) => {
                        controller.reset();
                    }
                    Some(UiCommand::Abandon) => {
                        controller.abandon();
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            outcome = controller.next_outcome() => {
                controller.complete(outcome);
            }
        }
    }

    // Releases the preview and stops any in-flight classification.
    drop(controller);
    Ok(())
}
