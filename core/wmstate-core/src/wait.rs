//! Bounded polling with an injectable sleep and a cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::PollConfig;
use crate::error::{Result, StateError};

/// Blocks the polling thread between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Shared flag another thread can set to abandon a running wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Linear backoff: each delay grows by `step`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    step: Duration,
    max: Option<Duration>,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            next: config.interval(),
            step: Duration::from_millis(config.step_ms),
            max: config.max_interval_ms.map(Duration::from_millis),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.max {
            Some(max) => self.next.min(max),
            None => self.next,
        };
        self.next = self.next.saturating_add(self.step);
        delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Satisfied { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl PollOutcome {
    pub fn is_satisfied(self) -> bool {
        matches!(self, PollOutcome::Satisfied { .. })
    }

    pub fn attempts(self) -> u32 {
        match self {
            PollOutcome::Satisfied { attempts } | PollOutcome::Exhausted { attempts } => attempts,
        }
    }
}

/// Runs a predicate up to `attempts` times, sleeping between attempts only.
#[derive(Clone)]
pub struct Poller {
    config: PollConfig,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancelToken,
}

impl Poller {
    pub fn new(config: PollConfig, sleeper: Arc<dyn Sleeper>, cancel: CancelToken) -> Self {
        Self {
            config,
            sleeper,
            cancel,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn with_config(&self, config: PollConfig) -> Self {
        Self {
            config,
            sleeper: Arc::clone(&self.sleeper),
            cancel: self.cancel.clone(),
        }
    }

    /// `predicate` receives the 1-based attempt number and returns `true`
    /// once the awaited condition holds. Errors from it end the poll at once.
    /// Running out of attempts is not an error; callers decide what it means.
    pub fn run<F>(&self, message: &str, mut predicate: F) -> Result<PollOutcome>
    where
        F: FnMut(u32) -> Result<bool>,
    {
        let attempts = self.config.attempts.max(1);
        let mut backoff = Backoff::new(&self.config);

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return Err(StateError::Cancelled(message.to_string()));
            }
            if predicate(attempt)? {
                return Ok(PollOutcome::Satisfied { attempts: attempt });
            }
            if attempt < attempts {
                let delay = backoff.next_delay();
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "{}",
                    message
                );
                self.sleeper.sleep(delay);
            }
        }

        tracing::debug!(attempts, "{} gave up", message);
        Ok(PollOutcome::Exhausted { attempts })
    }
}
