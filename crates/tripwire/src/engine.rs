// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tick::Clock;

use crate::break_duration::BreakDuration;
use crate::constants::ERR_POISONED_LOCK;
use crate::sampling::{SamplerState, Sampling};
use crate::state::CircuitState;

/// Engine that owns the circuit breaker state machine.
///
/// All bookkeeping lives behind a single mutex so that the admission check
/// and the outcome evaluation are each atomic. The guarded operation itself
/// never runs under this lock.
#[derive(Debug)]
pub(crate) struct Engine {
    shared: Mutex<Shared>,
    options: EngineOptions,
    clock: Clock,
}

/// Configuration options for the circuit breaker engine.
#[derive(Debug, Clone)]
pub(crate) struct EngineOptions {
    pub success_threshold: u32,
    pub failure_threshold: u32,
    pub break_duration: BreakDuration,
    pub sampling: Sampling,
}

/// An evaluated execution outcome.
///
/// From the perspective of a circuit breaker, an execution either succeeds
/// or fails. This enum captures that binary outcome.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Decision produced by the admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// The call may proceed.
    ///
    /// `probe` is set when the circuit is half-open and this execution
    /// tests whether the dependency has recovered.
    Accepted { probe: bool },

    /// The circuit is open; the call must not reach the dependency.
    Rejected,
}

/// State change produced by evaluating an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// The state remains unchanged.
    Unchanged,

    /// The circuit transitioned from closed to open.
    Opened {
        /// Cooldown chosen for this open period.
        break_duration: Duration,
    },

    /// The circuit re-opened due to a failed probe in half-open state.
    Reopened,

    /// The circuit transitioned back to closed after successful probing.
    Closed {
        /// Time the circuit spent open, measured from the first trip.
        open_duration: Duration,
    },
}

#[derive(Debug)]
struct Shared {
    state: State,
    sampler: SamplerState,
}

#[derive(Debug)]
enum State {
    Closed {
        /// Failures observed since the circuit last closed.
        failures: u32,
    },
    Open {
        /// Earliest instant at which a transition to half-open may occur.
        deadline: Instant,
        opened_at: Instant,
    },
    HalfOpen {
        /// Consecutive successful probes observed so far.
        successes: u32,
        opened_at: Instant,
    },
}

impl Engine {
    pub fn new(options: EngineOptions, clock: Clock) -> Self {
        Self {
            shared: Mutex::new(Shared {
                state: State::Closed { failures: 0 },
                sampler: SamplerState::default(),
            }),
            options,
            clock,
        }
    }

    /// Decides whether a call may reach the dependency.
    ///
    /// While the circuit is open, a success-like evaluation runs first so
    /// that an elapsed deadline can promote the circuit to half-open even
    /// when no outcome has been observed for a while. The state is then
    /// re-read: if the circuit is still open, the call is rejected.
    pub fn admit(&self) -> Admission {
        let now = self.clock.instant();

        // NOTE: Remember to execute all expensive operations (like time checks) outside the lock.
        let mut shared = self.shared.lock().expect(ERR_POISONED_LOCK);

        if matches!(shared.state, State::Open { .. }) && self.options.sampling.observe(&mut shared.sampler, now) {
            _ = shared.apply(Outcome::Success, now, &self.options);
        }

        match shared.state {
            State::Closed { .. } => Admission::Accepted { probe: false },
            State::HalfOpen { .. } => Admission::Accepted { probe: true },
            State::Open { .. } => Admission::Rejected,
        }
    }

    /// Feeds an observed outcome into the state machine, subject to the
    /// sampling policy. Unsampled observations leave the state untouched.
    pub fn record(&self, outcome: Outcome) -> Transition {
        let now = self.clock.instant();

        let mut shared = self.shared.lock().expect(ERR_POISONED_LOCK);

        if self.options.sampling.observe(&mut shared.sampler, now) {
            shared.apply(outcome, now, &self.options)
        } else {
            Transition::Unchanged
        }
    }

    /// Reads the current state without evaluating any transition.
    pub fn current_state(&self) -> CircuitState {
        match self.shared.lock().expect(ERR_POISONED_LOCK).state {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Remaining wait before an open circuit becomes eligible for probing.
    ///
    /// Zero when the circuit is not open, or when the deadline has already
    /// passed.
    pub fn reset_in(&self) -> Duration {
        let now = self.clock.instant();

        match self.shared.lock().expect(ERR_POISONED_LOCK).state {
            State::Open { deadline, .. } => deadline.saturating_duration_since(now),
            State::Closed { .. } | State::HalfOpen { .. } => Duration::ZERO,
        }
    }
}

impl Shared {
    fn apply(&mut self, outcome: Outcome, now: Instant, options: &EngineOptions) -> Transition {
        match &mut self.state {
            State::Closed { failures } => {
                // A success while closed is a no-op; the failure count is
                // reset only by a state transition.
                if outcome == Outcome::Success {
                    return Transition::Unchanged;
                }

                *failures = failures.saturating_add(1);
                if *failures < options.failure_threshold {
                    return Transition::Unchanged;
                }

                let break_duration = options.break_duration.call();
                self.state = State::Open {
                    deadline: now + break_duration,
                    opened_at: now,
                };
                Transition::Opened { break_duration }
            }
            State::Open { deadline, opened_at } => {
                // The outcome value is irrelevant while open; evaluation only
                // checks whether the cooldown has elapsed. Outcomes can land
                // here when another caller opened the circuit between the
                // admission check and this evaluation.
                if now >= *deadline {
                    self.state = State::HalfOpen {
                        successes: 0,
                        opened_at: *opened_at,
                    };
                }
                Transition::Unchanged
            }
            State::HalfOpen { successes, opened_at } => {
                let opened_at = *opened_at;

                if outcome == Outcome::Failure {
                    // The dependency is still unhealthy; re-open and re-arm
                    // the full cooldown.
                    self.state = State::Open {
                        deadline: now + options.break_duration.call(),
                        opened_at,
                    };
                    return Transition::Reopened;
                }

                *successes = successes.saturating_add(1);
                if *successes < options.success_threshold {
                    return Transition::Unchanged;
                }

                self.state = State::Closed { failures: 0 };
                Transition::Closed {
                    open_duration: now.saturating_duration_since(opened_at),
                }
            }
        }
    }
}
