//! A hook and behavior-module core for interactive fiction.
//!

pub use quill_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use quill_internal::prelude::*;
}
