//! Tracked asynchronous operations
//!
//! An [`AsyncOperation`] wraps a fallible async producer and exposes its
//! pending/value/error state to front ends. Runs are supersede-safe: only
//! the most recently started run may write its outcome.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;

use super::alert::AlertChannel;
use crate::error::{Error, Result};
use crate::models::Alert;
use crate::utils::lock;

/// Observable state of an operation
#[derive(Debug, Clone, Serialize)]
pub struct AsyncState<T> {
    pub value: Option<T>,
    pub error: Option<Error>,
    pub pending: bool,
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            pending: false,
        }
    }
}

/// How a single `run` settled
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Succeeded(T),
    Failed(Error),
    /// A newer run started before this one completed; nothing was recorded
    Superseded,
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn err(&self) -> Option<&Error> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct AsyncOperation<T> {
    name: &'static str,
    state: Mutex<AsyncState<T>>,
    generation: AtomicU64,
    alerts: Option<AlertChannel>,
}

impl<T: Clone> AsyncOperation<T> {
    /// Operation whose failures are only recorded, never published
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(AsyncState::default()),
            generation: AtomicU64::new(0),
            alerts: None,
        }
    }

    /// Operation publishing each failure as an error alert
    pub fn with_alerts(name: &'static str, alerts: AlertChannel) -> Self {
        Self {
            alerts: Some(alerts),
            ..Self::new(name)
        }
    }

    /// Run `producer` as the current invocation of this operation
    ///
    /// `pending` is raised before the producer is first polled. On failure
    /// the previous value is kept.
    pub async fn run<F>(&self, producer: F) -> Outcome<T>
    where
        F: Future<Output = Result<T>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.state).pending = true;

        let result = producer.await;

        let mut state = lock(&self.state);
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("[{}] discarding superseded run #{}", self.name, generation);
            return Outcome::Superseded;
        }
        state.pending = false;

        match result {
            Ok(value) => {
                state.value = Some(value.clone());
                state.error = None;
                Outcome::Succeeded(value)
            }
            Err(err) => {
                state.error = Some(err.clone());
                drop(state);
                log::warn!("[{}] failed: {}", self.name, err);
                if let Some(alerts) = &self.alerts {
                    alerts.publish(Alert::error(err.to_string()));
                }
                Outcome::Failed(err)
            }
        }
    }

    pub fn snapshot(&self) -> AsyncState<T> {
        lock(&self.state).clone()
    }

    pub fn value(&self) -> Option<T> {
        lock(&self.state).value.clone()
    }

    pub fn error(&self) -> Option<Error> {
        lock(&self.state).error.clone()
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending
    }

    /// Back to the initial state; any in-flight run is invalidated
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *lock(&self.state) = AsyncState::default();
    }

    /// Reset, then record `value` without running anything
    pub fn set_value(&self, value: T) {
        self.reset();
        lock(&self.state).value = Some(value);
    }

    /// Reset, then record `error` without publishing it
    pub fn set_error(&self, error: Error) {
        self.reset();
        lock(&self.state).error = Some(error);
    }
}

impl<T> std::fmt::Debug for AsyncOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("name", &self.name)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}
