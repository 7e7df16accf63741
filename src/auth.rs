//! Credential models: redacted token secrets and the token-grant wire envelope.

pub mod grant;
pub mod secret;

pub use grant::*;
pub use secret::*;
