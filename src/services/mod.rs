pub mod credential_issuer;
pub mod http;
pub mod verifier;

pub use credential_issuer::IssuanceClient;
pub use verifier::{VerificationClient, VerificationState};
