pub mod predicate;
pub mod proof_generation;
pub mod proof_verification;

pub use predicate::Predicate;
pub use proof_generation::{PlaceholderProver, PredicateProver, ProofArtifact, PublicSignals};
