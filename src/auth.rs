//! Auth-domain values: redacted secrets, persisted token records, and guest identifiers.

pub mod guest;
pub mod secret;
pub mod token;

pub use guest::*;
pub use secret::*;
pub use token::*;
