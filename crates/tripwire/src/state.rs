// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// The operating state of a circuit breaker.
///
/// A breaker is always in exactly one of the three states. It starts out
/// [`Closed`][Self::Closed] and moves between states based on the outcomes
/// it observes; see the [crate documentation][crate] for the full transition
/// diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(rename_all = "snake_case"))]
pub enum CircuitState {
    /// Normal operation. Calls pass through and failures are counted.
    Closed,

    /// The circuit is broken. Calls are rejected without reaching the
    /// dependency.
    Open,

    /// Probing after the break duration elapsed. Calls are let through to
    /// test whether the dependency has recovered.
    HalfOpen,
}

impl CircuitState {
    /// Returns the `snake_case` name of the state.
    ///
    /// This is the form used in telemetry attributes and log events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
