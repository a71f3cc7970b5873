// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solver options and cancellation

use crate::error::{Result, SolveError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Solver options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Coordinate-descent sweep budget
    pub max_iterations: usize,
    /// Initial step as a fraction of each domain's width
    pub initial_step_fraction: f64,
    /// Search stops once every step falls below this fraction
    pub min_step_fraction: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            initial_step_fraction: 0.25,
            min_step_fraction: 1e-9,
        }
    }
}

impl SolverOptions {
    /// Small budget for interactive use
    pub fn fast() -> Self {
        Self {
            max_iterations: 200,
            min_step_fraction: 1e-6,
            ..Self::default()
        }
    }

    /// Large budget for batch runs
    pub fn thorough() -> Self {
        Self {
            max_iterations: 20_000,
            min_step_fraction: 1e-12,
            ..Self::default()
        }
    }

    /// Set the iteration budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SolveError::InvalidOptions(
                "iteration budget must be at least 1".to_string(),
            ));
        }
        if !(self.initial_step_fraction > 0.0 && self.initial_step_fraction <= 1.0) {
            return Err(SolveError::InvalidOptions(
                "initial step fraction must be in (0, 1]".to_string(),
            ));
        }
        if !(self.min_step_fraction > 0.0 && self.min_step_fraction < self.initial_step_fraction) {
            return Err(SolveError::InvalidOptions(
                "minimum step fraction must be positive and below the initial step".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation shared between a caller and running solves
///
/// Clones share the same flag. An optional deadline cancels implicitly once
/// it has passed, and an optional poll limit once solves have checked the
/// flag that many times, which bounds the work of seeds explored together.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
    /// Polls left before cancelling
    polls: Option<Arc<AtomicUsize>>,
}

impl CancelFlag {
    /// Flag that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel automatically after a timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Cancel automatically once the flag has been checked `polls` times
    ///
    /// The solver checks once before starting and once per descent sweep.
    pub fn with_poll_limit(mut self, polls: usize) -> Self {
        self.polls = Some(Arc::new(AtomicUsize::new(polls)));
        self
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check if cancellation was requested, the deadline passed or the poll
    /// limit ran out
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d) {
            return true;
        }
        let Some(polls) = &self.polls else {
            return false;
        };
        let spent = polls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_err();
        if spent {
            self.cancel();
        }
        spent
    }
}
