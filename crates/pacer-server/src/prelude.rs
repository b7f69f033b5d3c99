//! Prelude module for pacer-server.
//!
//! Re-exports the most commonly used types and traits so they can be
//! imported with a single `use` statement.
//!
//! # Example
//!
//! ```rust
//! use pacer_server::prelude::*;
//! ```

// Re-export extractor types
pub use crate::extract::*;
// Re-export middleware types
pub use crate::middleware::*;
