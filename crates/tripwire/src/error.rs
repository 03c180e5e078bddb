// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// An error returned by a guarded execution.
///
/// The breaker never fails on its own behalf. Either the circuit was open
/// and the call was rejected before reaching the dependency
/// ([`Unavailable`][Self::Unavailable]), or the operation itself failed and
/// its error is passed through untouched
/// ([`Operation`][Self::Operation]).
///
/// The rejection variant deliberately carries no detail: at the time of
/// rejection nothing is known about the dependency beyond "it was failing
/// recently".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The circuit is open; the operation was not invoked.
    Unavailable,

    /// The operation was invoked and failed with its own error.
    Operation(E),
}

impl<E> Error<E> {
    /// Returns `true` when the call was rejected by an open circuit.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Returns the operation's own error, if there is one.
    #[must_use]
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Unavailable => None,
            Self::Operation(err) => Some(err),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("circuit is open"),
            Self::Operation(err) => err.fmt(f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Error<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable => None,
            Self::Operation(err) => Some(err),
        }
    }
}

impl<E: Recovery> Recovery for Error<E> {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            // The circuit re-evaluates itself over time; callers may come back.
            Self::Unavailable => RecoveryInfo::unavailable(),
            Self::Operation(err) => err.recovery(),
        }
    }
}
