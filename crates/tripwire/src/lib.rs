// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Circuit breaker for guarding calls to unreliable dependencies.
//!
//! A circuit breaker prevents cascading failures: once a dependency keeps
//! failing, further calls are short-circuited instead of piling up on a
//! service that cannot answer them, and the breaker self-heals by probing
//! the dependency after a cooldown.
//!
//! # Runtime Agnostic Design
//!
//! This crate is **runtime agnostic** and works across any async runtime.
//! Timing is provided by a [`Clock`][tick::Clock] from the [`tick`] crate,
//! which also makes every time-dependent behavior controllable in tests.
//!
//! # Circuit States and Transitions
//!
//! The circuit breaker operates in three states:
//!
//! - **Closed**: Normal operation. Calls pass through and failures are
//!   counted. Once the failure threshold is reached, the circuit opens.
//! - **Open**: The circuit is broken. Calls are rejected immediately with
//!   [`Error::Unavailable`] without reaching the dependency. After the
//!   break duration elapsed, the next attempt moves the circuit to
//!   half-open.
//! - **Half-Open**: Probing. Calls are let through to test whether the
//!   dependency recovered; enough consecutive successes close the circuit,
//!   a single failure re-opens it.
//!
//! ```text
//! ┌────────┐      Failure threshold reached       ┌──────────┐
//! │ Closed │ ────────────────────────────────────▶│   Open   │
//! └────────┘                                      └──────────┘
//!      ▲                                                 │
//!      │                                                 │
//!      │            ┌────────────────┐                   │
//!      └────────────│   Half-Open    │◀──────────────────┘
//!      Probing      └────────────────┘      Break duration
//!      successful                           elapsed
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use tripwire::{CircuitBreaker, Error};
//!
//! # async fn example(clock: Clock) {
//! // One breaker per guarded dependency, kept for the process lifetime.
//! let breaker = CircuitBreaker::builder("user_store", &clock)
//!     .failure_threshold(10)
//!     .success_threshold(5)
//!     .break_duration(Duration::from_secs(5))
//!     .build();
//!
//! match breaker.execute(|| load_user(42)).await {
//!     Ok(user) => println!("loaded {user}"),
//!     Err(Error::Unavailable) => println!("user store is on cooldown"),
//!     Err(Error::Operation(err)) => println!("lookup failed: {err}"),
//! }
//! # }
//! # async fn load_user(id: u32) -> Result<String, String> { Ok(format!("user-{id}")) }
//! ```
//!
//! # Sampling
//!
//! Under very high call volume, evaluating every outcome against the state
//! machine is unnecessary overhead. The [`Sampling`] policy thins the
//! bookkeeping out: unsampled calls still execute and return their real
//! result, they just do not update the circuit state. The default policy
//! evaluates every call.
//!
//! # Testing
//!
//! Time is injected, never read from the system. Construct the breaker
//! with a clock made from [`ClockControl`][tick::ClockControl] and advance
//! it manually; no test ever needs to sleep:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tick::ClockControl;
//! use tripwire::CircuitBreaker;
//!
//! # fn example() {
//! let control = ClockControl::new();
//! let breaker = CircuitBreaker::builder("flaky", &control.to_clock())
//!     .break_duration(Duration::from_secs(5))
//!     .build();
//!
//! // ... trip the circuit, then skip the cooldown:
//! control.advance(Duration::from_secs(5));
//! assert!(breaker.is_closed());
//! # }
//! ```
//!
//! # Features
//!
//! This crate supports several optional features:
//!
//! - `logs`: Emits `tracing` events for state transitions, rejections, and
//!   probe results.
//! - `metrics`: Exposes a `resilience.event` OpenTelemetry counter; see the
//!   [`telemetry`] module for the attribute keys.
//! - `serde`: Serialization support for the passive configuration types
//!   ([`Sampling`], [`CircuitState`]).

#[doc(inline)]
pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};

mod break_duration;
mod breaker;
mod callbacks;
mod constants;
mod engine;
mod error;
mod sampling;
mod state;

pub mod telemetry;

pub use breaker::{Builder, CircuitBreaker};
pub use callbacks::{OnClosedArgs, OnOpenedArgs};
pub use error::Error;
pub use sampling::Sampling;
pub use state::CircuitState;
