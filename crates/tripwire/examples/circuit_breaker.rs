// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaker example that simulates a major service outage and
//! tripping of the circuit breaker by:
//!
//! 1. Counting failures of a flaky downstream call
//! 2. Opening the circuit when the failure threshold is reached
//! 3. Rejecting calls while the dependency cools down
//! 4. Probing and automatically closing the circuit when the service recovers

use std::time::Duration;

use tick::Clock;
use tripwire::{CircuitBreaker, Error};

#[tokio::main]
async fn main() {
    // Send state transition log events to the console.
    tracing_subscriber::fmt().init();

    let clock = Clock::new_tokio();

    let breaker = CircuitBreaker::builder("flaky_service", &clock)
        // Decrease the following values to see the circuit breaker trip
        // faster and speed up the example
        .failure_threshold(5)
        .success_threshold(2)
        .break_duration(Duration::from_secs(2))
        .on_opened(|args| println!("circuit opened, cooling down for {:?}", args.break_duration()))
        .on_closed(|args| println!("circuit closed again, was open for {:?}", args.open_duration()))
        .build();

    // Execute multiple attempts; the circuit breaker eventually opens
    // because the failure rate exceeds the threshold, then recovers once
    // the simulated outage ends.
    for attempt in 0..60 {
        clock.delay(Duration::from_millis(100)).await;

        match breaker.execute(|| flaky_service(attempt)).await {
            Ok(output) => println!("{attempt}: {output}"),
            Err(Error::Unavailable) => println!("{attempt}: rejected, retry in {:?}", breaker.reset_in()),
            Err(Error::Operation(err)) => println!("{attempt}: {err}"),
        }
    }
}

// Simulate a major service outage: the first 30 attempts mostly fail,
// after that the service recovers and always succeeds.
async fn flaky_service(attempt: u32) -> Result<String, String> {
    if attempt > 30 {
        return Ok(format!("output-{attempt}"));
    }

    if fastrand::u8(0..10) > 2 {
        Err(format!("transient error on attempt {attempt}"))
    } else {
        Ok(format!("output-{attempt}"))
    }
}
