// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use tick::Clock;

use crate::Error;
use crate::break_duration::BreakDuration;
use crate::callbacks::{OnClosed, OnClosedArgs, OnOpened, OnOpenedArgs};
use crate::constants::{DEFAULT_BREAK_DURATION, DEFAULT_FAILURE_THRESHOLD, DEFAULT_SUCCESS_THRESHOLD};
use crate::engine::{Admission, Engine, EngineOptions, Outcome, Transition};
use crate::sampling::Sampling;
use crate::state::CircuitState;
#[cfg(any(feature = "metrics", test))]
use crate::telemetry::metrics;

/// Guards calls to an unreliable dependency.
///
/// A `CircuitBreaker` wraps executions of a fallible operation and monitors
/// their outcomes. Once too many failures are observed, the circuit opens
/// and further calls are rejected without reaching the dependency, giving
/// it time to recover. After a cooldown the circuit lets probing calls
/// through and closes again once enough of them succeed.
///
/// Create an instance with [`builder`][Self::builder], one per guarded
/// dependency, and keep it for the lifetime of the process.
///
/// # Cloning and shared state
///
/// Cloning a `CircuitBreaker` is inexpensive (an `Arc` clone) and every
/// clone shares the same circuit state. Hand out clones to the tasks that
/// call the dependency; they all observe and influence the same circuit.
///
/// # Thread Safety
///
/// `CircuitBreaker` is `Send` and `Sync`. The internal bookkeeping is a
/// single short critical section; the guarded operation itself runs outside
/// of it, so concurrent in-flight calls to the dependency are not
/// serialized by the breaker.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use tripwire::{CircuitBreaker, Error};
///
/// # async fn example(clock: Clock) {
/// let breaker = CircuitBreaker::builder("billing_api", &clock)
///     .failure_threshold(10)
///     .success_threshold(5)
///     .break_duration(Duration::from_secs(5))
///     .build();
///
/// match breaker.execute(|| charge_customer()).await {
///     Ok(receipt) => println!("charged: {receipt}"),
///     Err(Error::Unavailable) => println!("billing is on cooldown, try later"),
///     Err(Error::Operation(err)) => println!("charge failed: {err}"),
/// }
/// # }
/// # async fn charge_customer() -> Result<String, String> { Ok("receipt-1".into()) }
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    name: Cow<'static, str>,
    engine: Engine,
    on_opened: Option<OnOpened>,
    on_closed: Option<OnClosed>,
    #[cfg(any(feature = "metrics", test))]
    event_reporter: opentelemetry::metrics::Counter<u64>,
}

impl CircuitBreaker {
    /// Starts configuring a circuit breaker.
    ///
    /// The `name` identifies this breaker in telemetry and should use
    /// `snake_case` naming, e.g. `billing_api`. The clock is the breaker's
    /// only source of time; pass a controlled clock in tests to drive the
    /// cooldown deterministically.
    pub fn builder(name: impl Into<Cow<'static, str>>, clock: &Clock) -> Builder {
        Builder {
            name: name.into(),
            clock: clock.clone(),
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            break_duration: BreakDuration::constant(DEFAULT_BREAK_DURATION),
            sampling: Sampling::always(),
            on_opened: None,
            on_closed: None,
            #[cfg(any(feature = "metrics", test))]
            meter: metrics::create_meter(opentelemetry::global::meter_provider().as_ref()),
        }
    }

    /// Executes `operation` under the protection of the circuit.
    ///
    /// The admission check runs first: if the circuit is open and the
    /// cooldown has not elapsed, the call is rejected with
    /// [`Error::Unavailable`] and `operation` is **not** invoked. Otherwise
    /// the operation runs exactly once and its result is returned
    /// unchanged, with errors wrapped in [`Error::Operation`].
    ///
    /// Each admitted execution contributes one outcome observation, subject
    /// to the configured [`Sampling`] policy. Cancellation and timeouts are
    /// the caller's responsibility; the breaker only observes the outcome
    /// after the operation returns.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let probe = match self.inner.engine.admit() {
            Admission::Rejected => {
                self.report_rejected();
                return Err(Error::Unavailable);
            }
            Admission::Accepted { probe } => probe,
        };

        // The operation runs outside the engine lock; only the bookkeeping
        // before and after is serialized.
        let result = operation().await;

        let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };

        if probe {
            self.report_probe(outcome);
        }

        match self.inner.engine.record(outcome) {
            Transition::Unchanged | Transition::Reopened => {}
            Transition::Opened { break_duration } => {
                self.report_opened();
                if let Some(on_opened) = &self.inner.on_opened {
                    on_opened.call(OnOpenedArgs { break_duration });
                }
            }
            Transition::Closed { open_duration } => {
                self.report_closed(open_duration);
                if let Some(on_closed) = &self.inner.on_closed {
                    on_closed.call(OnClosedArgs { open_duration });
                }
            }
        }

        result.map_err(Error::Operation)
    }

    /// Returns the name this breaker reports itself under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the current state of the circuit.
    ///
    /// This is a plain read without side effects: an open circuit whose
    /// cooldown has elapsed still reads as [`CircuitState::Open`] until the
    /// next execution attempt evaluates the deadline.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.engine.current_state()
    }

    /// Returns `true` when the circuit is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Returns `true` when the circuit is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Returns `true` when the circuit is half-open.
    #[must_use]
    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    /// Returns the remaining wait before an open circuit may probe again.
    ///
    /// Zero when the circuit is not open, or when the cooldown has already
    /// elapsed.
    #[must_use]
    pub fn reset_in(&self) -> Duration {
        self.inner.engine.reset_in()
    }

    fn report_rejected(&self) {
        #[cfg(any(feature = "metrics", test))]
        self.inner.event_reporter.add(
            1,
            &[
                opentelemetry::KeyValue::new(crate::telemetry::STRATEGY_NAME, self.inner.name.clone()),
                opentelemetry::KeyValue::new(crate::telemetry::EVENT_NAME, crate::telemetry::CIRCUIT_REJECTED_EVENT_NAME),
                opentelemetry::KeyValue::new(crate::telemetry::CIRCUIT_STATE, CircuitState::Open.as_str()),
            ],
        );

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "tripwire.circuit_breaker.rejected",
            tracing::Level::WARN,
            circuit_breaker.name = %self.inner.name,
            circuit_breaker.state = CircuitState::Open.as_str(),
        );

        _ = self;
    }

    fn report_probe(&self, outcome: Outcome) {
        #[cfg(any(feature = "metrics", test))]
        self.inner.event_reporter.add(
            1,
            &[
                opentelemetry::KeyValue::new(crate::telemetry::STRATEGY_NAME, self.inner.name.clone()),
                opentelemetry::KeyValue::new(crate::telemetry::EVENT_NAME, crate::telemetry::CIRCUIT_PROBE_EVENT_NAME),
                opentelemetry::KeyValue::new(crate::telemetry::CIRCUIT_STATE, CircuitState::HalfOpen.as_str()),
                opentelemetry::KeyValue::new(crate::telemetry::CIRCUIT_PROBE_RESULT, outcome.as_str()),
            ],
        );

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "tripwire.circuit_breaker.probe",
            tracing::Level::INFO,
            circuit_breaker.name = %self.inner.name,
            circuit_breaker.state = CircuitState::HalfOpen.as_str(),
            circuit_breaker.probe.result = outcome.as_str(),
        );

        _ = (self, outcome);
    }

    fn report_opened(&self) {
        #[cfg(any(feature = "metrics", test))]
        self.inner.event_reporter.add(
            1,
            &[
                opentelemetry::KeyValue::new(crate::telemetry::STRATEGY_NAME, self.inner.name.clone()),
                opentelemetry::KeyValue::new(crate::telemetry::EVENT_NAME, crate::telemetry::CIRCUIT_OPENED_EVENT_NAME),
                opentelemetry::KeyValue::new(crate::telemetry::CIRCUIT_STATE, CircuitState::Open.as_str()),
            ],
        );

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "tripwire.circuit_breaker.opened",
            tracing::Level::WARN,
            circuit_breaker.name = %self.inner.name,
            circuit_breaker.state = CircuitState::Open.as_str(),
        );

        _ = self;
    }

    fn report_closed(&self, open_duration: Duration) {
        #[cfg(any(feature = "metrics", test))]
        self.inner.event_reporter.add(
            1,
            &[
                opentelemetry::KeyValue::new(crate::telemetry::STRATEGY_NAME, self.inner.name.clone()),
                opentelemetry::KeyValue::new(crate::telemetry::EVENT_NAME, crate::telemetry::CIRCUIT_CLOSED_EVENT_NAME),
                opentelemetry::KeyValue::new(crate::telemetry::CIRCUIT_STATE, CircuitState::Closed.as_str()),
            ],
        );

        #[cfg(any(feature = "logs", test))]
        tracing::event!(
            name: "tripwire.circuit_breaker.closed",
            tracing::Level::INFO,
            circuit_breaker.name = %self.inner.name,
            circuit_breaker.state = CircuitState::Closed.as_str(),
            circuit_breaker.open.duration = open_duration.as_secs(),
        );

        _ = (self, open_duration);
    }
}

/// Configures and constructs a [`CircuitBreaker`].
///
/// Every parameter has a default, so `build` can be called at any point.
/// See the builder methods for the individual defaults.
#[derive(Debug)]
pub struct Builder {
    name: Cow<'static, str>,
    clock: Clock,
    success_threshold: u32,
    failure_threshold: u32,
    break_duration: BreakDuration,
    sampling: Sampling,
    on_opened: Option<OnOpened>,
    on_closed: Option<OnClosed>,
    #[cfg(any(feature = "metrics", test))]
    meter: opentelemetry::metrics::Meter,
}

impl Builder {
    /// Sets the number of consecutive successful probes in half-open state
    /// required before the circuit closes again.
    ///
    /// Defaults to `5`. Values below `1` are treated as `1`.
    #[must_use]
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the number of failures observed in closed state that will trip
    /// the circuit.
    ///
    /// Defaults to `10`. Values below `1` are treated as `1`.
    #[must_use]
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets a fixed cooldown the circuit stays open before probing.
    ///
    /// Defaults to 5 seconds.
    #[must_use]
    pub fn break_duration(mut self, duration: Duration) -> Self {
        self.break_duration = BreakDuration::constant(duration);
        self
    }

    /// Sets a cooldown produced by a function, invoked each time the
    /// circuit opens.
    ///
    /// Use this to vary the cooldown between openings, e.g. to add jitter
    /// so that breakers tripped by the same outage do not all probe at the
    /// same instant.
    #[must_use]
    pub fn break_duration_with<F>(mut self, duration: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        self.break_duration = BreakDuration::new(duration);
        self
    }

    /// Sets the policy deciding which outcomes update the circuit state.
    ///
    /// Defaults to [`Sampling::always`], which evaluates every outcome.
    #[must_use]
    pub fn sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Registers a callback invoked when the circuit transitions from
    /// closed to open.
    ///
    /// Re-openings caused by failed probes do not invoke the callback; they
    /// are always preceded by an opening that did.
    #[must_use]
    pub fn on_opened<F>(mut self, callback: F) -> Self
    where
        F: Fn(OnOpenedArgs) + Send + Sync + 'static,
    {
        self.on_opened = Some(OnOpened::new(callback));
        self
    }

    /// Registers a callback invoked when the circuit transitions back to
    /// closed after successful probing.
    #[must_use]
    pub fn on_closed<F>(mut self, callback: F) -> Self
    where
        F: Fn(OnClosedArgs) + Send + Sync + 'static,
    {
        self.on_closed = Some(OnClosed::new(callback));
        self
    }

    /// Overrides the global meter provider used for metrics.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn meter_provider(mut self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        self.meter = metrics::create_meter(provider);
        self
    }

    /// Builds the circuit breaker.
    #[must_use]
    pub fn build(self) -> CircuitBreaker {
        #[cfg(any(feature = "metrics", test))]
        let event_reporter = metrics::create_resilience_event_counter(&self.meter);

        let options = EngineOptions {
            success_threshold: self.success_threshold.max(1),
            failure_threshold: self.failure_threshold.max(1),
            break_duration: self.break_duration,
            sampling: self.sampling,
        };

        CircuitBreaker {
            inner: Arc::new(Inner {
                name: self.name,
                engine: Engine::new(options, self.clock),
                on_opened: self.on_opened,
                on_closed: self.on_closed,
                #[cfg(any(feature = "metrics", test))]
                event_reporter,
            }),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
#[cfg(not(miri))]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
    use tick::ClockControl;

    use super::*;

    fn test_breaker(clock: &Clock) -> CircuitBreaker {
        CircuitBreaker::builder("test_breaker", clock)
            .failure_threshold(3)
            .success_threshold(3)
            .break_duration(Duration::from_secs(1))
            .build()
    }

    async fn fail(breaker: &CircuitBreaker) {
        let result: Result<(), _> = breaker.execute(|| async { Err("failure") }).await;
        assert!(result.is_err());
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(CircuitBreaker: Send, Sync, Clone);
    }

    #[test]
    fn builder_defaults() {
        let breaker = CircuitBreaker::builder("defaults", &Clock::new_frozen()).build();

        assert_eq!(breaker.name(), "defaults");
        assert!(breaker.is_closed());
        assert!(!breaker.is_open());
        assert!(!breaker.is_half_open());
        assert_eq!(breaker.reset_in(), Duration::ZERO);
    }

    #[test]
    fn zero_thresholds_are_clamped() {
        let clock = Clock::new_frozen();
        let breaker = CircuitBreaker::builder("clamped", &clock)
            .failure_threshold(0)
            .success_threshold(0)
            .build();

        // A single failure must already trip the circuit.
        futures::executor::block_on(fail(&breaker));
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn passthrough_success() {
        let breaker = test_breaker(&Clock::new_frozen());

        let result = breaker.execute(|| async { Ok::<_, &str>("output") }).await;

        assert_eq!(result.unwrap(), "output");
        assert!(breaker.is_closed());
    }

    #[tokio::test]
    async fn rejected_call_does_not_invoke_operation() {
        let breaker = test_breaker(&Clock::new_frozen());
        for _ in 0..3 {
            fail(&breaker).await;
        }
        assert!(breaker.is_open());

        let invoked = AtomicBool::new(false);
        let result: Result<(), Error<&str>> = breaker
            .execute(|| {
                invoked.store(true, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result.unwrap_err(), Error::Unavailable);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn operation_error_passes_through_verbatim() {
        let breaker = test_breaker(&Clock::new_frozen());

        let result: Result<(), _> = breaker.execute(|| async { Err("boom") }).await;

        assert_eq!(result.unwrap_err(), Error::Operation("boom"));
    }

    #[tokio::test]
    async fn rejection_emits_metrics() {
        let exporter = InMemoryMetricExporter::default();
        let meter_provider = SdkMeterProvider::builder()
            .with_periodic_exporter(exporter.clone())
            .build();

        let clock = Clock::new_frozen();
        let breaker = CircuitBreaker::builder("metered", &clock)
            .failure_threshold(1)
            .meter_provider(&meter_provider)
            .build();

        fail(&breaker).await;
        let result: Result<(), Error<&str>> = breaker.execute(|| async { Ok(()) }).await;
        assert!(result.unwrap_err().is_unavailable());

        meter_provider.force_flush().unwrap();
        let metrics = format!("{:?}", exporter.get_finished_metrics().unwrap());

        assert!(metrics.contains("resilience.event"));
        assert!(metrics.contains("metered"));
        assert!(metrics.contains(crate::telemetry::CIRCUIT_OPENED_EVENT_NAME));
        assert!(metrics.contains(crate::telemetry::CIRCUIT_REJECTED_EVENT_NAME));
    }

    #[tokio::test]
    async fn probe_emits_metrics() {
        let exporter = InMemoryMetricExporter::default();
        let meter_provider = SdkMeterProvider::builder()
            .with_periodic_exporter(exporter.clone())
            .build();

        let control = ClockControl::new();
        let clock = control.to_clock();
        let breaker = CircuitBreaker::builder("probing", &clock)
            .failure_threshold(1)
            .success_threshold(1)
            .break_duration(Duration::from_secs(1))
            .meter_provider(&meter_provider)
            .build();

        fail(&breaker).await;
        control.advance(Duration::from_secs(1));

        let result = breaker.execute(|| async { Ok::<_, &str>(()) }).await;
        assert!(result.is_ok());
        assert!(breaker.is_closed());

        meter_provider.force_flush().unwrap();
        let metrics = format!("{:?}", exporter.get_finished_metrics().unwrap());

        assert!(metrics.contains(crate::telemetry::CIRCUIT_PROBE_EVENT_NAME));
        assert!(metrics.contains(crate::telemetry::CIRCUIT_CLOSED_EVENT_NAME));
    }
}
