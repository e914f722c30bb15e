use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::client::RecommendationService;
use crate::error::{ErrorKind, UploadError};
use crate::image_source::ImageSource;
use crate::model::{Book, UploadResult};

/// Identifies one upload issued by a [`RecommendationSession`].
///
/// Tokens increase monotonically per session; only the latest one may write
/// its outcome into the view state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a presentation layer shows for a failed upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl UploadFailure {
    fn rejected(server_message: &str) -> Self {
        Self {
            kind: ErrorKind::Application,
            message: format!("Upload failed: {server_message}"),
        }
    }
}

impl From<&UploadError> for UploadFailure {
    fn from(err: &UploadError) -> Self {
        match err {
            UploadError::Input { source, .. } => Self {
                kind: ErrorKind::Input,
                message: format!("Could not read the photo: {source}"),
            },
            UploadError::Transport(e) if e.is_timeout() => Self {
                kind: ErrorKind::Transport,
                message: "The recommendation service took too long to respond.".to_string(),
            },
            UploadError::Transport(_) => Self {
                kind: ErrorKind::Transport,
                message: "Could not reach the recommendation service.".to_string(),
            },
            UploadError::Protocol(_) => Self {
                kind: ErrorKind::Protocol,
                message: "The recommendation service returned an unexpected response.".to_string(),
            },
            UploadError::Application { message } => Self::rejected(message),
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Observable state of the recommendation screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub loading: bool,
    pub result: Option<UploadResult>,
    pub error: Option<UploadFailure>,
    /// Request allowed to write into this state; `None` before the first
    /// upload and after a cancellation.
    pub token: Option<RequestToken>,
}

impl ViewState {
    /// Books to render; empty unless the latest upload succeeded.
    pub fn books(&self) -> &[Book] {
        match &self.result {
            Some(result) if result.success => &result.books,
            _ => &[],
        }
    }
}

/// Drives uploads for one screen and publishes a [`ViewState`] per change.
///
/// Starting an upload clears whatever was displayed. When uploads overlap, only
/// the most recently started one is applied; earlier responses are dropped no
/// matter when they arrive.
pub struct RecommendationSession<S> {
    service: S,
    issued: AtomicU64,
    state: watch::Sender<ViewState>,
}

impl<S: RecommendationService> RecommendationSession<S> {
    pub fn new(service: S) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            service,
            issued: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Issue a new token and enter the loading state with results cleared.
    pub fn begin(&self) -> RequestToken {
        let mut issued = RequestToken(0);
        // issue under the channel lock so tokens and state updates stay in order
        self.state.send_modify(|state| {
            issued = RequestToken(self.issued.fetch_add(1, Ordering::Relaxed) + 1);
            *state = ViewState {
                loading: true,
                result: None,
                error: None,
                token: Some(issued),
            };
        });
        info!(token = %issued, "upload started");
        issued
    }

    /// Apply `outcome` if `token` is still the latest request.
    ///
    /// Returns `false` when the outcome was discarded as stale.
    pub fn complete(&self, token: RequestToken, outcome: Result<UploadResult, UploadError>) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if state.token != Some(token) {
                return false;
            }
            state.loading = false;
            match outcome {
                Ok(result) => {
                    if !result.success {
                        state.error = Some(UploadFailure::rejected(&result.message));
                    }
                    state.result = Some(result);
                }
                Err(err) => state.error = Some(UploadFailure::from(&err)),
            }
            true
        });
        if !applied {
            debug!(token = %token, "discarding superseded upload outcome");
        }
        applied
    }

    /// Abandon the in-flight upload, if any. Its outcome will be discarded and
    /// the previous (already cleared) results stay cleared.
    pub fn cancel(&self) -> bool {
        let mut cancelled = None;
        self.state.send_if_modified(|state| {
            if !state.loading {
                return false;
            }
            cancelled = state.token.take();
            state.loading = false;
            true
        });
        if let Some(token) = cancelled {
            info!(token = %token, "upload cancelled");
        }
        cancelled.is_some()
    }

    /// Run one upload end to end.
    ///
    /// Returns `None` if the upload was cancelled or a newer upload started
    /// while this one was in flight; the view state is then left alone.
    pub async fn submit<I>(&self, source: &I) -> Option<Result<Vec<Book>, UploadFailure>>
    where
        I: ImageSource + ?Sized,
    {
        let token = self.begin();
        let outcome = match source.image_path().await {
            Ok(path) => self.service.upload(&path).await,
            Err(err) => Err(err),
        };

        let reply = match &outcome {
            Ok(result) if result.success => Ok(result.books.clone()),
            Ok(result) => Err(UploadFailure::rejected(&result.message)),
            Err(err) => Err(UploadFailure::from(err)),
        };
        self.complete(token, outcome).then_some(reply)
    }
}
