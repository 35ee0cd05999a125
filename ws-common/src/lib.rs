//! Runtime plumbing shared by the binaries and integration tests.

pub mod tracing_init;
