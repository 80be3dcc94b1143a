//! Deadlines and timeout helpers.
//!
//! Deadlines are absolute instants, stored per direction on an adapter. A
//! change applies to the next operation and to any operation already waiting.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::error::{ProtocolError, Result};

/// Default timeout for establishing a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a server waits for the client preface
pub const DEFAULT_PREFACE_TIMEOUT: Duration = Duration::from_secs(10);

/// A settable absolute deadline.
///
/// Calls waiting under [`with_deadline`] observe every change, so moving the
/// deadline (or setting it to now) affects operations already in progress.
#[derive(Debug)]
pub struct Deadline {
    at: watch::Sender<Option<Instant>>,
}

impl Default for Deadline {
    fn default() -> Self {
        let (at, _) = watch::channel(None);
        Self { at }
    }
}

impl Deadline {
    pub fn set(&self, at: Option<Instant>) {
        self.at.send_replace(at);
    }

    pub fn get(&self) -> Option<Instant> {
        *self.at.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Instant>> {
        self.at.subscribe()
    }
}

/// Run `fut` until `deadline` passes.
///
/// A deadline already in the past fails at once. The timer is re-armed
/// whenever the deadline changes while `fut` is pending; `None` disarms it.
pub async fn with_deadline<F, T>(deadline: &Deadline, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let mut changes = deadline.subscribe();
    tokio::pin!(fut);

    loop {
        let current = *changes.borrow_and_update();
        if matches!(current, Some(at) if at <= Instant::now()) {
            return Err(ProtocolError::Timeout);
        }

        let expiry = async move {
            match current {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            result = &mut fut => return result,
            () = expiry => return Err(ProtocolError::Timeout),
            Ok(()) = changes.changed() => continue,
        }
    }
}

/// Run `fut` for at most `duration`.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| ProtocolError::Timeout)?
}
