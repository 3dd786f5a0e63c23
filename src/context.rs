//! Cancellation context threaded through every send
//!
//! A [`Context`] carries a cancellation token and an optional deadline. It is
//! created once by the caller (usually at process start with
//! [`Context::with_shutdown_signal`]) and passed explicitly to each send.
//! Cancelling it aborts a pending dial or TLS handshake right away; once the SMTP
//! exchange has started it is observed at the next read or write.

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    future::Future,
    time::Duration,
};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context is done
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Done {
    /// The token was cancelled
    Cancelled,
    /// The deadline passed
    DeadlineExceeded,
}

impl Display for Done {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Done::Cancelled => "context cancelled",
            Done::DeadlineExceeded => "context deadline exceeded",
        })
    }
}

impl StdError for Done {}

/// Cancellation token plus optional deadline
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Wraps an existing token
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Creates a context cancelled when the process receives Ctrl-C, or SIGTERM on unix
    ///
    /// Call this once at startup, from within a tokio runtime, and pass the
    /// result (or children of it) to every send.
    pub fn with_shutdown_signal() -> Self {
        let ctx = Self::background();
        let token = ctx.token.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received, cancelling pending sends");
            token.cancel();
        });
        ctx
    }

    /// Derives a child context expiring after `timeout`
    ///
    /// The child is cancelled with its parent and keeps the parent's deadline
    /// when that one comes first. Cancelling the child leaves the parent alone.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
        }
    }

    /// Derives a child context sharing the parent's deadline
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and all of its children
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is done, or `None` while it is still live
    pub fn err(&self) -> Option<Done> {
        if self.token.is_cancelled() {
            Some(Done::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(Done::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub async fn done(&self) -> Done {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Done::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Done::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Done::Cancelled
            }
        }
    }

    /// Runs `fut` unless the context finishes first
    ///
    /// A context that is already done fails without polling `fut` at all.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Done> {
        if let Some(done) = self.err() {
            return Err(done);
        }

        tokio::select! {
            biased;
            done = self.done() => Err(done),
            out = fut => Ok(out),
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn background_never_finishes() {
        let ctx = Context::background();
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_context_skips_the_future() {
        let ctx = Context::background();
        ctx.cancel();

        let mut polled = false;
        let res = ctx
            .run(async {
                polled = true;
            })
            .await;
        assert_eq!(res, Err(Done::Cancelled));
        assert!(!polled);
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_children() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        let sibling = parent.child();

        child.cancel();
        assert_eq!(parent.err(), None);
        assert_eq!(sibling.err(), None);

        parent.cancel();
        assert_eq!(sibling.err(), Some(Done::Cancelled));
    }

    #[tokio::test]
    async fn deadline_interrupts_pending_future() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let res = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(res, Err(Done::DeadlineExceeded));
        assert_eq!(ctx.err(), Some(Done::DeadlineExceeded));
    }

    #[tokio::test]
    async fn child_keeps_earlier_parent_deadline() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
