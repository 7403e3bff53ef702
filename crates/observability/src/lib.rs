//! Process-wide tracing setup shared by every binary and test harness.

mod subscriber;

pub use subscriber::{init, init_with, LogFormat};
