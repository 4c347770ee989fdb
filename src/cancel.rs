use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{AppError, AppResult};

/// Cancellation signal shared by everything started on behalf of one
/// consumer. Cloning shares the signal.
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Drives `work` unless the token fires first, in which case the work is
    /// dropped and [`AppError::Cancelled`] is returned.
    pub async fn run<F, T>(&self, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AppError::Cancelled),
            result = work => result,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
