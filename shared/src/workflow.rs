use crate::model::{Prediction, PredictionStatus};
use futures::channel::oneshot;
use futures::future::{select, Either, FutureExt, Shared};
use log::{debug, info, warn};
use std::fmt::Display;
use std::future::Future;
use std::pin::pin;
use std::time::Duration;
use thiserror::Error;

/// Pause between a finished upload and the create call.
pub const INITIAL_DELAY: Duration = Duration::from_millis(500);
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const DEFAULT_FAILURE_MESSAGE: &str = "Prediction failed";

/// Every variant displays the upstream or validation message unchanged so it
/// can go straight into a user notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    PredictionCreate(String),
    #[error("{0}")]
    PredictionPoll(String),
    #[error("{0}")]
    PredictionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Submission {
    #[default]
    Idle,
    Submitting {
        image_url: String,
    },
    Polling {
        image_url: String,
        prediction: Prediction,
        output: Option<String>,
    },
    Succeeded {
        image_url: String,
        prediction: Prediction,
        output: Option<String>,
    },
    Failed {
        image_url: Option<String>,
        error: WorkflowError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionEvent {
    Uploaded(String),
    Created(Prediction),
    Polled(Prediction),
    RelayFailed(WorkflowError),
    Reset,
}

impl Submission {
    pub fn apply(self, event: SubmissionEvent) -> Submission {
        match (self, event) {
            (_, SubmissionEvent::Reset) => Submission::Idle,
            (Submission::Idle, SubmissionEvent::Uploaded(image_url)) => {
                Submission::Submitting { image_url }
            }
            (Submission::Submitting { image_url }, SubmissionEvent::Created(prediction)) => {
                Self::settle(image_url, prediction, None)
            }
            (
                Submission::Polling {
                    image_url, output, ..
                },
                SubmissionEvent::Polled(prediction),
            ) => Self::settle(image_url, prediction, output),
            (Submission::Idle, SubmissionEvent::RelayFailed(error)) => Submission::Failed {
                image_url: None,
                error,
            },
            (
                Submission::Submitting { image_url } | Submission::Polling { image_url, .. },
                SubmissionEvent::RelayFailed(error),
            ) => Submission::Failed {
                image_url: Some(image_url),
                error,
            },
            (state, event) => {
                warn!("Ignoring {:?} in state {}", event, state.label());
                state
            }
        }
    }

    // A response without output keeps the last frame on screen
    fn settle(image_url: String, prediction: Prediction, previous: Option<String>) -> Submission {
        let output = prediction.output.clone().or(previous);
        match prediction.status {
            PredictionStatus::Starting | PredictionStatus::Processing => Submission::Polling {
                image_url,
                prediction,
                output,
            },
            PredictionStatus::Succeeded => Submission::Succeeded {
                image_url,
                prediction,
                output,
            },
            PredictionStatus::Failed | PredictionStatus::Canceled => {
                let message = prediction
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                Submission::Failed {
                    image_url: Some(image_url),
                    error: WorkflowError::PredictionFailed(message),
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Submission::Idle => "idle",
            Submission::Submitting { .. } => "submitting",
            Submission::Polling { .. } => "polling",
            Submission::Succeeded { .. } => "succeeded",
            Submission::Failed { .. } => "failed",
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            Submission::Idle => None,
            Submission::Submitting { image_url }
            | Submission::Polling { image_url, .. }
            | Submission::Succeeded { image_url, .. } => Some(image_url),
            Submission::Failed { image_url, .. } => image_url.as_deref(),
        }
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Submission::Polling { output, .. } | Submission::Succeeded { output, .. } => {
                output.as_deref()
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        match self {
            Submission::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Submitting or polling: a job is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Submission::Submitting { .. } | Submission::Polling { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Submission::Succeeded { .. } | Submission::Failed { .. }
        )
    }

    /// Whether the end-of-job controls can be shown. A success waits until the
    /// browser has finished loading the final output, given as `loaded_output`.
    pub fn controls_ready(&self, loaded_output: Option<&str>) -> bool {
        match self {
            Submission::Failed { .. } => true,
            Submission::Succeeded {
                output: Some(output),
                ..
            } => loaded_output == Some(output.as_str()),
            _ => false,
        }
    }
}

/// Hands out job numbers so results of abandoned uploads and submissions can
/// be told apart from the current one.
#[derive(Debug, Default)]
pub struct JobCounter {
    next: u64,
}

impl JobCounter {
    pub fn begin(&mut self) -> u64 {
        let job = self.next;
        self.next += 1;
        job
    }

    /// Makes every job handed out so far stale.
    pub fn invalidate(&mut self) {
        self.next += 1;
    }

    pub fn is_current(&self, job: u64) -> bool {
        job + 1 == self.next
    }
}

/// Access to the prediction relay.
pub trait PredictionApi {
    type Error: Display;

    fn create(&self, image_url: &str) -> impl Future<Output = Result<Prediction, Self::Error>>;
    fn get(&self, id: &str) -> impl Future<Output = Result<Prediction, Self::Error>>;
}

/// Timer used between relay calls.
pub trait Pacer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Owned by whoever started the submission. Cancelling or dropping it stops the
/// poll loop at its current await point.
#[derive(Debug)]
pub struct CancelHandle {
    _sender: oneshot::Sender<()>,
}

impl CancelHandle {
    pub fn cancel(self) {}
}

#[derive(Clone)]
pub struct CancelToken {
    signal: Shared<oneshot::Receiver<()>>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = oneshot::channel();
    (
        CancelHandle { _sender: sender },
        CancelToken {
            signal: receiver.shared(),
        },
    )
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.signal.clone().now_or_never().is_some()
    }

    /// Runs `fut` unless cancellation arrives first. Returns `None` when
    /// cancelled, and never polls `fut` once the token is cancelled.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        let fut = pin!(fut);
        match select(fut, self.signal.clone()).await {
            Either::Left((output, _)) => Some(output),
            Either::Right(_) => None,
        }
    }
}

/// Drives one submission from a freshly uploaded image to a terminal state,
/// reporting each state through `on_update`. Returns `None` if cancelled.
pub async fn run_submission<A, P, F>(
    api: &A,
    pacer: &P,
    image_url: String,
    cancel: &CancelToken,
    mut on_update: F,
) -> Option<Submission>
where
    A: PredictionApi,
    P: Pacer,
    F: FnMut(&Submission),
{
    let mut state = Submission::Idle.apply(SubmissionEvent::Uploaded(image_url.clone()));
    on_update(&state);

    cancel.guard(pacer.sleep(INITIAL_DELAY)).await?;

    let event = match cancel.guard(api.create(&image_url)).await? {
        Ok(prediction) => {
            info!("Prediction {} created ({})", prediction.id, prediction.status);
            SubmissionEvent::Created(prediction)
        }
        Err(e) => SubmissionEvent::RelayFailed(WorkflowError::PredictionCreate(e.to_string())),
    };
    state = state.apply(event);
    on_update(&state);

    while let Submission::Polling { prediction, .. } = &state {
        let id = prediction.id.clone();
        cancel.guard(pacer.sleep(POLL_INTERVAL)).await?;

        let event = match cancel.guard(api.get(&id)).await? {
            Ok(prediction) => {
                debug!("Prediction {} is {}", prediction.id, prediction.status);
                SubmissionEvent::Polled(prediction)
            }
            Err(e) => SubmissionEvent::RelayFailed(WorkflowError::PredictionPoll(e.to_string())),
        };
        state = state.apply(event);
        on_update(&state);
    }

    info!("Submission finished: {}", state.label());
    Some(state)
}
