// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

/// Policy deciding which observations are evaluated by the state machine.
///
/// Evaluating an outcome means taking the breaker's internal lock and
/// running a state transition. Under very high call volume that bookkeeping
/// can be thinned out: a sampled breaker still executes every call and
/// returns its real result, but only the sampled subset of outcomes updates
/// the circuit state.
///
/// A policy is an OR-combination of up to three triggers:
///
/// - **first**: the first `n` observations are always evaluated.
/// - **every**: every `n`-th observation is evaluated.
/// - **interval**: an observation is evaluated when at least the given
///   time has passed since the last evaluated one.
///
/// The default policy is [`always`][Self::always], which evaluates every
/// observation (strict mode).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tripwire::Sampling;
///
/// // Evaluate every fourth outcome.
/// let sampling = Sampling::every(4);
///
/// // Evaluate the first 100 outcomes, then at most one per second.
/// let sampling = Sampling::first(100).with_interval(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
pub struct Sampling {
    first: u32,
    every: u32,
    interval: Option<Duration>,
}

impl Sampling {
    /// Evaluates every observation.
    ///
    /// This is the strict default: the state machine sees every outcome.
    #[must_use]
    pub fn always() -> Self {
        Self::every(1)
    }

    /// Evaluates every `every`-th observation.
    ///
    /// A value of `0` or `1` evaluates every observation.
    #[must_use]
    pub fn every(every: u32) -> Self {
        Self {
            first: 0,
            every: every.max(1),
            interval: None,
        }
    }

    /// Evaluates only the first `first` observations.
    ///
    /// Combine with [`with_every`][Self::with_every] or
    /// [`with_interval`][Self::with_interval] to keep evaluating after the
    /// initial burst.
    #[must_use]
    pub fn first(first: u32) -> Self {
        Self {
            first,
            every: 0,
            interval: None,
        }
    }

    /// Evaluates at most one observation per `interval`.
    #[must_use]
    pub fn interval(interval: Duration) -> Self {
        Self {
            first: 0,
            every: 0,
            interval: Some(interval),
        }
    }

    /// Additionally evaluates the first `first` observations.
    #[must_use]
    pub fn with_first(mut self, first: u32) -> Self {
        self.first = first;
        self
    }

    /// Additionally evaluates every `every`-th observation.
    #[must_use]
    pub fn with_every(mut self, every: u32) -> Self {
        self.every = every.max(1);
        self
    }

    /// Additionally evaluates an observation when `interval` has passed
    /// since the last evaluated one.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Decides whether the current observation is evaluated and advances
    /// the sampler bookkeeping.
    ///
    /// The caller holds the breaker lock; `state` is part of the protected
    /// shared state so concurrent observations cannot double-count.
    pub(crate) fn observe(&self, state: &mut SamplerState, now: Instant) -> bool {
        let due = (self.first > 0 && state.count < u64::from(self.first))
            || (self.every > 0 && state.count % u64::from(self.every) == 0)
            || self.interval.is_some_and(|interval| {
                state
                    .last
                    .is_none_or(|last| now.saturating_duration_since(last) >= interval)
            });

        if due {
            state.last = Some(now);
        }
        state.count = state.count.saturating_add(1);

        due
    }
}

impl Default for Sampling {
    fn default() -> Self {
        Self::always()
    }
}

/// Mutable sampler bookkeeping, owned by the engine's shared state.
#[derive(Debug, Default)]
pub(crate) struct SamplerState {
    /// Number of observations seen so far.
    count: u64,

    /// Instant of the most recent evaluated observation.
    last: Option<Instant>,
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    fn observe_n(sampling: &Sampling, state: &mut SamplerState, now: Instant, n: usize) -> Vec<bool> {
        (0..n).map(|_| sampling.observe(state, now)).collect()
    }

    #[test]
    fn always_evaluates_every_observation() {
        let sampling = Sampling::always();
        let mut state = SamplerState::default();

        let decisions = observe_n(&sampling, &mut state, Instant::now(), 5);

        assert_eq!(decisions, vec![true; 5]);
    }

    #[test]
    fn default_is_strict() {
        assert_eq!(Sampling::default(), Sampling::always());
    }

    #[test]
    fn every_nth_follows_the_stride() {
        let sampling = Sampling::every(3);
        let mut state = SamplerState::default();

        let decisions = observe_n(&sampling, &mut state, Instant::now(), 7);

        assert_eq!(decisions, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn every_zero_is_treated_as_every_call() {
        let sampling = Sampling::every(0);
        let mut state = SamplerState::default();

        let decisions = observe_n(&sampling, &mut state, Instant::now(), 3);

        assert_eq!(decisions, vec![true; 3]);
    }

    #[test]
    fn first_evaluates_only_the_initial_burst() {
        let sampling = Sampling::first(2);
        let mut state = SamplerState::default();

        let decisions = observe_n(&sampling, &mut state, Instant::now(), 4);

        assert_eq!(decisions, vec![true, true, false, false]);
    }

    #[test]
    fn first_combines_with_every() {
        let sampling = Sampling::first(2).with_every(4);
        let mut state = SamplerState::default();

        // Observations 0 and 1 via `first`, 0 and 4 via `every`.
        let decisions = observe_n(&sampling, &mut state, Instant::now(), 6);

        assert_eq!(decisions, vec![true, true, false, false, true, false]);
    }

    #[test]
    fn interval_gates_on_elapsed_time() {
        let sampling = Sampling::interval(Duration::from_secs(1));
        let mut state = SamplerState::default();
        let start = Instant::now();

        // The very first observation has no previous evaluation and is due.
        assert!(sampling.observe(&mut state, start));
        assert!(!sampling.observe(&mut state, start + Duration::from_millis(999)));
        assert!(sampling.observe(&mut state, start + Duration::from_secs(1)));
        assert!(!sampling.observe(&mut state, start + Duration::from_secs(1)));
    }

    #[test]
    fn counter_saturates() {
        let sampling = Sampling::every(2);
        let mut state = SamplerState {
            count: u64::MAX,
            last: None,
        };

        // Must not panic; the exact decision at the saturation point is
        // irrelevant.
        _ = sampling.observe(&mut state, Instant::now());
        _ = sampling.observe(&mut state, Instant::now());
    }

    #[test]
    fn serde_round_trip() {
        let sampling = Sampling::every(8).with_first(10).with_interval(Duration::from_secs(5));

        let json = serde_json::to_string(&sampling).unwrap();
        let parsed: Sampling = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, sampling);
    }
}
