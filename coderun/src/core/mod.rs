//! Deterministic, pure logic shared by the executor and generator.
//!
//! Core modules must be free of I/O side effects. They operate on names and
//! text handed to them and return deterministic outputs suitable for tests.

pub mod language;
pub mod project;
pub mod topic;
