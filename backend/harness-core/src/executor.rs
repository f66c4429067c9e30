//! Bounded execution of document units.
//!
//! Each unit runs as its own task so the caller can stop waiting on it. A
//! unit that misses its deadline is aborted and the session treats the
//! timeout as fatal; the unit is never retried.

use crate::error::session::SessionError;

use common::ErrorLocation;

use std::any::Any;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::time::timeout as TokioTimeout;

pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct UnitExecutor {
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl UnitExecutor {
    pub fn new(max_concurrent_units: usize, deadline: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent_units)),
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `unit` on the pool and wait at most the deadline for its result.
    ///
    /// The deadline covers the unit's run, not the wait for a free slot.
    pub async fn run<T, F>(&self, document: &str, unit: F) -> Result<T, SessionError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SessionError::Pool {
                message: format!("Unit pool closed before {document} could run: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            unit.await
        });
        let _abort = AbortOnDrop(handle.abort_handle());

        match TokioTimeout(self.deadline, handle).await {
            Ok(Ok(value)) => {
                debug!("Unit {document} finished");
                Ok(value)
            }
            Ok(Err(join)) if join.is_panic() => {
                let message = panic_message(join.into_panic());
                error!("Unit {document} panicked: {message}");
                Err(SessionError::Panicked {
                    message: format!("Unit {document} panicked: {message}"),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Ok(Err(join)) => Err(SessionError::Pool {
                message: format!("Unit {document} was cancelled: {join}"),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => {
                error!("Unit {document} timed out after {:?}", self.deadline);
                Err(SessionError::Timeout {
                    document: document.to_string(),
                    message: format!("No result for {document} within {:?}", self.deadline),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }
}

impl Default for UnitExecutor {
    fn default() -> Self {
        Self::new(1, DEFAULT_UNIT_TIMEOUT)
    }
}

/// Aborts the unit task when the caller stops waiting for it.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
