//! Domain layer: entities and allocation logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod basis_points;
pub mod entities;
pub mod error;
pub mod normalizer;

pub use basis_points::to_basis_points;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use normalizer::{initialize, set_share, slider_step, total_of, Normalizer};

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
///
/// Returns the input unchanged when a variable cannot be resolved.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
