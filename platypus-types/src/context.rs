//! Caller-supplied cancellation and deadline context.
//!
//! Every outbound provider call takes a [`CallContext`]. An operation checks
//! the context before touching the network and races the in-flight request
//! against [`CallContext::done`], so a canceled caller never blocks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::PlatypusError;

/// Cancellation signal plus optional deadline, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels every [`CallContext`] derived from the one it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that is never canceled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A cancelable context and the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx: Arc::new(tx) })
    }

    /// Derives a context whose deadline is `timeout` from now (or the
    /// existing deadline, whichever comes first).
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// True once the context was canceled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.is_canceled() || self.is_expired()
    }

    /// Returns `Canceled` if the context is already done.
    pub fn check(&self) -> Result<(), PlatypusError> {
        if self.is_canceled() {
            return Err(PlatypusError::Canceled("context canceled".into()));
        }
        if self.is_expired() {
            return Err(PlatypusError::Canceled("context deadline exceeded".into()));
        }
        Ok(())
    }

    /// Resolves when the context is canceled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn done(&self) -> PlatypusError {
        let canceled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // A dropped handle can no longer cancel.
                    if rx.wait_for(|canceled| *canceled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = canceled => PlatypusError::Canceled("context canceled".into()),
            _ = expired => PlatypusError::Canceled("context deadline exceeded".into()),
        }
    }

    /// Runs `fut` unless the context finishes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, PlatypusError>
    where
        F: std::future::Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_background_is_never_done() {
        let ctx = CallContext::background();
        assert!(!ctx.is_done());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel_marks_all_clones_done() {
        let (ctx, handle) = CallContext::with_cancel();
        let derived = ctx.with_timeout(Duration::from_secs(60));
        handle.cancel();
        assert!(ctx.is_done());
        assert!(derived.is_done());
        assert_eq!(ctx.check().unwrap_err().kind(), ErrorKind::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_done());
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(ctx.is_done());
        assert!(ctx.check().unwrap_err().is_canceled());
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = CallContext::background().with_deadline(now + Duration::from_secs(5));
        let later = ctx.with_deadline(now + Duration::from_secs(30));
        assert_eq!(later.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_run_aborts_pending_future() {
        let (ctx, handle) = CallContext::with_cancel();
        let task = tokio::spawn(async move {
            ctx.run(std::future::pending::<()>()).await
        });
        tokio::task::yield_now().await;
        handle.cancel();
        let result = task.await.unwrap();
        assert!(result.unwrap_err().is_canceled());
    }

    #[tokio::test]
    async fn test_run_completes_when_not_canceled() {
        let ctx = CallContext::background();
        let value = ctx.run(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }
}
