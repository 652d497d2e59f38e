//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem)
//! but are themselves concrete structs, not traits.

mod session;

pub use session::{SessionService, DRAFT_FILE, HISTORY_FILE};
