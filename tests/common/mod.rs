//! Common test utilities shared by the integration tests

pub mod factories;

pub use factories::*;
