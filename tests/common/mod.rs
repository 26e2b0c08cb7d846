//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use factory::{Name, SingleNameMachine, StdEngine};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test-friendly subscriber once; `RUST_LOG=factory=debug` for details.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("factory=warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_test_writer()
            .try_init();
    });
}

/// A machine building the `String` component `id` with a constant value.
pub fn value_machine(id: &str, priority: i32, value: &str) -> SingleNameMachine {
    let value = value.to_string();
    SingleNameMachine::new(
        priority,
        StdEngine::new(Name::of::<String>(id))
            .with_priority(priority)
            .build_with(move |_| Ok(value.clone())),
    )
}

/// Like [`value_machine`], counting how many times the value is built.
pub fn counting_machine(id: &str, value: &str, builds: &Arc<AtomicUsize>) -> SingleNameMachine {
    let value = value.to_string();
    let builds = Arc::clone(builds);
    SingleNameMachine::new(
        0,
        StdEngine::new(Name::of::<String>(id)).build_with(move |_| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(value.clone())
        }),
    )
}
