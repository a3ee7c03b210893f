//! Topic-to-pull-request code runner.
//!
//! A CI workflow turns a `Topic:` issue into generated code and then runs it.
//! This crate holds the two reproducible pieces of that pipeline:
//!
//! - **[`generate`]**: one chat-completion request whose answer is written,
//!   untouched, into the working directory.
//! - **[`execute`]**: detect the project shape from marker files, install
//!   dependencies, run the entry point, tee everything to a log.
//!
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (marker precedence, dispatch table,
//!   language guess). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, processes, HTTP).
//!   Behind traits where tests substitute fakes.

pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod generate;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
