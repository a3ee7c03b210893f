//! I/O helpers for coderun commands.

pub mod config;
pub mod execution_log;
pub mod generator;
pub mod process;
pub mod toolchain;
pub mod workspace;
