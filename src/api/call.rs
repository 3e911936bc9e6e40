//! Running API calls on their own task, with progress and cancellation.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::client::ApiClient;
use super::errors::CallError;

tokio::task_local! {
    /// Token of the spawned call currently running on this task
    static CALL_TOKEN: CancellationToken;
}

/// Progress notification for one call that reached the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Emitted right before the first attempt is sent
    Started { id: u64, operation: &'static str },
    Finished {
        id: u64,
        operation: &'static str,
        outcome: Result<(), CallError>,
    },
}

impl CallEvent {
    #[must_use]
    pub const fn id(&self) -> u64 {
        match self {
            Self::Started { id, .. } | Self::Finished { id, .. } => *id,
        }
    }

    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Started { operation, .. } | Self::Finished { operation, .. } => operation,
        }
    }
}

/// A call running in the background
#[derive(Debug)]
pub struct CallHandle<T> {
    token: CancellationToken,
    task: JoinHandle<Result<T, CallError>>,
}

impl<T> CallHandle<T> {
    /// Abandon the call. Any backoff sleep or in-flight exchange is cut short
    /// and [`CallHandle::join`] yields [`CallError::Cancelled`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the call's result
    ///
    /// # Errors
    ///
    /// Returns the call's own [`CallError`], or [`CallError::Unknown`] if the
    /// task panicked
    pub async fn join(self) -> Result<T, CallError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(CallError::Cancelled),
            Err(e) => {
                error!("API call task failed: {e}");
                Err(CallError::unknown(e.to_string()))
            }
        }
    }
}

impl ApiClient {
    /// Run `call` on its own tokio task.
    ///
    /// The task gets its own cancellation token, a child of the client's
    /// shutdown token, so both [`CallHandle::cancel`] and
    /// [`ApiClient::shutdown`] stop it.
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use kiosklink::api::{ApiClient, PackageQuery};
    /// # async fn demo(client: Arc<ApiClient>) {
    /// let handle = client.spawn(|client| async move {
    ///     client.get_packages(&PackageQuery::default()).await
    /// });
    /// let packages = handle.join().await;
    /// # }
    /// ```
    pub fn spawn<T, F, Fut>(self: &Arc<Self>, call: F) -> CallHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = Result<T, CallError>> + Send + 'static,
    {
        let token = self.call_token();
        let future = call(Arc::clone(self));
        let scoped = token.clone();
        let task = tokio::spawn(async move {
            match CALL_TOKEN.scope(scoped.clone(), future).await {
                Err(_) if scoped.is_cancelled() => {
                    debug!("Spawned API call was cancelled");
                    Err(CallError::Cancelled)
                }
                result => result,
            }
        });
        CallHandle { token, task }
    }

    /// Cancellation token for the next pipeline run: the spawned call's own
    /// token when inside [`ApiClient::spawn`], otherwise a fresh child of the
    /// shutdown token.
    pub(crate) fn call_token(&self) -> CancellationToken {
        CALL_TOKEN
            .try_with(CancellationToken::child_token)
            .unwrap_or_else(|_| self.shutdown_token().child_token())
    }
}
