//! Bounded-time backend calls.
//!
//! A timed call runs on its own thread and reports back over a bounded
//! channel. On expiry the thread is left to finish in the background and its
//! result is discarded.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::error::{Error, Result};

/// How a timed call ended.
#[derive(Debug)]
pub enum Outcome<T> {
    Finished(T),
    Panicked(String),
    TimedOut(Duration),
}

/// Run `task`, giving up after `limit`. `None` runs it inline without a limit.
pub fn run_with_timeout<T, F>(limit: Option<Duration>, task: F) -> Outcome<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(limit) = limit else {
        return match catch_unwind(AssertUnwindSafe(task)) {
            Ok(value) => Outcome::Finished(value),
            Err(payload) => Outcome::Panicked(panic_message(payload)),
        };
    };

    let (tx, rx) = bounded(1);
    let spawned = thread::Builder::new()
        .name("hybridpdf-call".to_string())
        .spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(task));
            // The receiver is gone when the call already timed out
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        return Outcome::Panicked(format!("cannot spawn worker thread: {}", e));
    }

    match rx.recv_timeout(limit) {
        Ok(Ok(value)) => Outcome::Finished(value),
        Ok(Err(payload)) => Outcome::Panicked(panic_message(payload)),
        Err(RecvTimeoutError::Timeout) => Outcome::TimedOut(limit),
        Err(RecvTimeoutError::Disconnected) => Outcome::Panicked("worker exited without a result".to_string()),
    }
}

/// Call a rule/OCR/image-table backend under the backend timeout.
pub fn call_backend<T, F>(backend: &str, limit: Option<Duration>, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match run_with_timeout(limit, task) {
        Outcome::Finished(result) => result,
        Outcome::Panicked(message) => Err(Error::failure(backend, format!("panicked: {}", message))),
        Outcome::TimedOut(elapsed) => Err(Error::BackendTimeout {
            backend: backend.to_string(),
            elapsed,
        }),
    }
}

/// Call the LLM backend under the LLM timeout.
pub fn call_llm<T, F>(backend: &str, limit: Duration, task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match run_with_timeout(Some(limit), task) {
        Outcome::Finished(result) => result,
        Outcome::Panicked(message) => Err(Error::failure(backend, format!("panicked: {}", message))),
        Outcome::TimedOut(elapsed) => Err(Error::LlmTimeout(elapsed)),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
