/*!
 * Retry policies for network-touching operations.
 *
 * A policy is asked, after each transient failure, whether to try again.
 * It never decides on non-transient errors: those propagate immediately.
 */

use std::fmt::Debug;
use std::time::Duration;

use log::{info, warn};

use crate::errors::MediaError;
use crate::providers::{Sleeper, VideoInfo};

/// Outcome of a retry decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting `after`
    Retry { after: Duration },
    /// Give up and surface the error
    Abort,
}

/// Given an error and how many attempts were made, decide retry-or-abort
pub trait RetryPolicy: Debug {
    fn decide(&self, operation: &str, error: &MediaError, attempt: u32) -> RetryDecision;
}

/// Yes/no decision source (a human at a terminal, or a fixed answer)
pub trait Confirm: Debug {
    fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, question: &str) -> bool {
        info!("{} -> {}", question, if self.0 { "yes" } else { "no" });
        self.0
    }
}

impl<C: Confirm + ?Sized> Confirm for &C {
    fn confirm(&self, question: &str) -> bool {
        (**self).confirm(question)
    }
}

/// Answer to the quality menu shown after probing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityChoice {
    /// One of the probed heights
    Height(u32),
    /// Skip the video and produce an mp3
    AudioOnly,
    /// Highest available quality
    Best,
}

/// Picks a quality when none was requested (a menu at a terminal, or a fixed answer)
pub trait QualityChooser: Debug {
    fn choose(&self, video: &VideoInfo) -> QualityChoice;
}

/// Always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedChoice(pub QualityChoice);

impl Default for FixedChoice {
    fn default() -> Self {
        Self(QualityChoice::Best)
    }
}

impl QualityChooser for FixedChoice {
    fn choose(&self, _video: &VideoInfo) -> QualityChoice {
        self.0
    }
}

/// Asks a `Confirm` source after every failure; no attempt limit
#[derive(Debug, Clone)]
pub struct InteractiveRetry<C: Confirm> {
    confirm: C,
}

impl<C: Confirm> InteractiveRetry<C> {
    pub fn new(confirm: C) -> Self {
        Self { confirm }
    }
}

impl<C: Confirm> RetryPolicy for InteractiveRetry<C> {
    fn decide(&self, operation: &str, error: &MediaError, _attempt: u32) -> RetryDecision {
        let question = if error.requires_purge() {
            format!("Critical file error while {}: {}. Purge temporary video files and download again?", operation, error)
        } else {
            format!("Network error while {}: {}. Try again?", operation, error)
        };

        if self.confirm.confirm(&question) {
            RetryDecision::Retry { after: Duration::ZERO }
        } else {
            RetryDecision::Abort
        }
    }
}

/// Retries up to a fixed number of attempts with a constant delay
#[derive(Debug, Clone, Copy)]
pub struct LimitedRetry {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for LimitedRetry {
    fn decide(&self, _operation: &str, _error: &MediaError, attempt: u32) -> RetryDecision {
        if attempt < self.max_attempts {
            RetryDecision::Retry { after: self.delay }
        } else {
            RetryDecision::Abort
        }
    }
}

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn decide(&self, _operation: &str, _error: &MediaError, _attempt: u32) -> RetryDecision {
        RetryDecision::Abort
    }
}

/// Runs an operation under a retry policy
#[derive(Debug, Clone, Copy)]
pub struct Retrier<'a> {
    policy: &'a dyn RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Retrier<'a> {
    pub fn new(policy: &'a dyn RetryPolicy, sleeper: &'a dyn Sleeper) -> Self {
        Self { policy, sleeper }
    }

    /// Run `operation` until it succeeds, fails non-transiently, or the policy aborts
    pub fn run<T>(&self, operation: &str, attempt_fn: impl FnMut(u32) -> Result<T, MediaError>) -> Result<T, MediaError> {
        self.run_with_cleanup(operation, attempt_fn, |_| {})
    }

    /// Like `run`, calling `before_retry` with the failing error ahead of each new attempt
    pub fn run_with_cleanup<T>(
        &self,
        operation: &str,
        mut attempt_fn: impl FnMut(u32) -> Result<T, MediaError>,
        mut before_retry: impl FnMut(&MediaError),
    ) -> Result<T, MediaError> {
        let mut attempt = 1;
        loop {
            let error = match attempt_fn(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => error,
            };

            warn!("Attempt {} of {} failed: {}", attempt, operation, error);
            match self.policy.decide(operation, &error, attempt) {
                RetryDecision::Abort => {
                    return Err(MediaError::Aborted {
                        attempts: attempt,
                        reason: error.to_string(),
                    });
                }
                RetryDecision::Retry { after } => {
                    before_retry(&error);
                    if !after.is_zero() {
                        self.sleeper.sleep(after);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
