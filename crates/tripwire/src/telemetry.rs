// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! # Circuit Breaker Telemetry
//!
//! This module defines the well-known attribute / label keys used when
//! emitting telemetry (metrics, traces, logs) from the circuit breaker.
//!
//! The constants are stable keys you can attach to:
//!
//! - metrics (e.g. counters, histograms)
//! - tracing spans / events
//! - structured log records
//!
//! # Conventions
//!
//! Names follow the [OpenTelemetry naming guidelines](https://opentelemetry.io/docs/specs/semconv/general/naming/#general-naming-considerations).
//!
//! - Keys should be dot-separated (e.g., `resilience.strategy.name`)
//! - Values should be concise and short, preferably using `snake_case`

#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;

/// Key used to annotate the name of the circuit breaker emitting an event.
///
/// Values reported under this dimension should be short and concise,
/// preferably in `snake_case`. Examples: `billing_api`, `user_store`.
pub const STRATEGY_NAME: &str = "resilience.strategy.name";

/// Key used to annotate the specific resilience event being emitted.
///
/// One of `circuit_opened`, `circuit_closed`, `circuit_rejected`, or
/// `circuit_probe`.
pub const EVENT_NAME: &str = "resilience.event.name";

/// Key used to annotate the circuit state associated with an event.
///
/// One of `closed`, `open`, or `half_open`.
pub const CIRCUIT_STATE: &str = "resilience.circuit_breaker.state";

/// Key used to annotate the result of a probe execution.
///
/// Either `success` or `failure`; only present on probe events.
pub const CIRCUIT_PROBE_RESULT: &str = "resilience.circuit_breaker.probe.result";

pub(crate) const CIRCUIT_OPENED_EVENT_NAME: &str = "circuit_opened";
pub(crate) const CIRCUIT_CLOSED_EVENT_NAME: &str = "circuit_closed";
pub(crate) const CIRCUIT_REJECTED_EVENT_NAME: &str = "circuit_rejected";
pub(crate) const CIRCUIT_PROBE_EVENT_NAME: &str = "circuit_probe";

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_keys_are_stable() {
        assert_eq!(STRATEGY_NAME, "resilience.strategy.name");
        assert_eq!(EVENT_NAME, "resilience.event.name");
        assert_eq!(CIRCUIT_STATE, "resilience.circuit_breaker.state");
        assert_eq!(CIRCUIT_PROBE_RESULT, "resilience.circuit_breaker.probe.result");
    }
}
