//! Shared helpers for integration tests.

#![allow(dead_code)]

use lps::{Lps, LpsConfig, MemoryBus};
use std::time::Duration;

pub const POLL: Duration = Duration::from_millis(10);
pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(100);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn test_config(domain: &str) -> LpsConfig {
    LpsConfig {
        poll_interval: POLL,
        ..LpsConfig::with_domain(domain)
    }
}

pub fn start_on(bus: &MemoryBus, domain: &str) -> Lps {
    init_tracing();
    Lps::start_with_transport(test_config(domain), bus.attach(POLL)).unwrap()
}
