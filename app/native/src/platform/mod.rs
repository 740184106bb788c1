//! Small platform helpers shared across modules.
//!
//! - [`path`] - tilde expansion and path containment checks
//! - [`thread`] - named worker threads

pub mod path;
pub mod thread;
