//! fundsplit: keep fund shares summing to 100% while one share at a time is edited.
//!
//! The core lives in [`domain::normalizer`]; the remaining layers persist an
//! allocation session and expose it on the command line.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
