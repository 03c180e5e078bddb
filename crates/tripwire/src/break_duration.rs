// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::Duration;

/// Produces the cooldown applied each time the circuit opens.
///
/// Wrapping a function instead of a plain `Duration` lets callers vary the
/// cooldown between openings, e.g. to add jitter so that many breakers
/// tripped by the same outage do not all probe at the same instant.
pub(crate) struct BreakDuration(Arc<dyn Fn() -> Duration + Send + Sync>);

impl BreakDuration {
    pub(crate) fn new<F>(duration: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        Self(Arc::new(duration))
    }

    pub(crate) fn constant(duration: Duration) -> Self {
        Self::new(move || duration)
    }

    pub(crate) fn call(&self) -> Duration {
        (self.0)()
    }
}

impl Clone for BreakDuration {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl std::fmt::Debug for BreakDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakDuration").finish()
    }
}
