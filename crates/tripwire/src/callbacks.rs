// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::Duration;

/// Callback invoked when the circuit transitions from closed to open.
pub(crate) struct OnOpened(Arc<dyn Fn(OnOpenedArgs) + Send + Sync>);

impl OnOpened {
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: Fn(OnOpenedArgs) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub(crate) fn call(&self, args: OnOpenedArgs) {
        (self.0)(args);
    }
}

impl Clone for OnOpened {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl std::fmt::Debug for OnOpened {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnOpened").finish()
    }
}

/// Callback invoked when the circuit transitions back to closed.
pub(crate) struct OnClosed(Arc<dyn Fn(OnClosedArgs) + Send + Sync>);

impl OnClosed {
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: Fn(OnClosedArgs) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub(crate) fn call(&self, args: OnClosedArgs) {
        (self.0)(args);
    }
}

impl Clone for OnClosed {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl std::fmt::Debug for OnClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnClosed").finish()
    }
}

/// Arguments for the [`on_opened`][crate::Builder::on_opened] callback.
///
/// Provides context when the circuit transitions to the open state.
#[derive(Debug)]
#[non_exhaustive]
pub struct OnOpenedArgs {
    pub(crate) break_duration: Duration,
}

impl OnOpenedArgs {
    /// Returns the cooldown chosen for this open period.
    #[must_use]
    pub fn break_duration(&self) -> Duration {
        self.break_duration
    }
}

/// Arguments for the [`on_closed`][crate::Builder::on_closed] callback.
///
/// Provides context when the circuit transitions back to the closed state
/// after successful probing.
#[derive(Debug)]
#[non_exhaustive]
pub struct OnClosedArgs {
    pub(crate) open_duration: Duration,
}

impl OnClosedArgs {
    /// Returns how long the circuit was open, measured from the moment it
    /// first tripped. Re-openings caused by failed probes do not restart
    /// this measurement.
    #[must_use]
    pub fn open_duration(&self) -> Duration {
        self.open_duration
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn on_opened_args_accessors() {
        let args = OnOpenedArgs {
            break_duration: Duration::from_secs(5),
        };

        assert_eq!(args.break_duration(), Duration::from_secs(5));
        assert!(format!("{args:?}").contains("OnOpenedArgs"));
    }

    #[test]
    fn on_closed_args_accessors() {
        let args = OnClosedArgs {
            open_duration: Duration::from_secs(7),
        };

        assert_eq!(args.open_duration(), Duration::from_secs(7));
        assert!(format!("{args:?}").contains("OnClosedArgs"));
    }

    #[test]
    fn callbacks_invoke_the_wrapped_function() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = Arc::clone(&called);

        let on_opened = OnOpened::new(move |args| {
            assert_eq!(args.break_duration(), Duration::from_secs(1));
            called_clone.store(true, Ordering::SeqCst);
        });

        on_opened.call(OnOpenedArgs {
            break_duration: Duration::from_secs(1),
        });
        assert!(called.load(Ordering::SeqCst));
    }
}
