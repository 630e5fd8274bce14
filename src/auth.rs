//! Credential models: redacted secrets and access/refresh token pairs.

pub mod pair;
pub mod secret;

pub use pair::*;
pub use secret::*;
