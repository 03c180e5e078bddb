// Copyright (c) Microsoft Corporation.

use std::time::Duration;

/// Default number of consecutive successful probes in half-open state
/// required before the circuit closes again.
pub(crate) const DEFAULT_SUCCESS_THRESHOLD: u32 = 5;

/// Default number of failures observed in closed state that will
/// trip the circuit.
pub(crate) const DEFAULT_FAILURE_THRESHOLD: u32 = 10;

/// Default duration that the circuit remains open (broken) before
/// transitioning to half-open to test if the dependency has recovered.
pub(crate) const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(5);

pub(crate) const ERR_POISONED_LOCK: &str =
    "poisoned lock - cannot continue execution because the circuit state can no longer be trusted";
