//! SAIT Schedule Builder Core Library
//!
//! This library builds conflict-free class schedules from SAIT Banner course
//! data and pushes a chosen schedule back into the registration system.

pub mod enumerator;
pub mod error;
pub mod headers;
pub mod ics;
pub mod registration;
pub mod sources;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        enumerator::enumerate, headers::*, ics::*, registration::*, sources::*, types::*,
    };
}
