// src/zkp/proof_verification.rs
//! Local checks on proof artifacts before they leave the wallet.

use crate::zkp::proof_generation::{placeholder_proof, ProofArtifact, PLACEHOLDER_PROOF_PREFIX};

/// Returns `true` when `artifact` was produced for `challenge`.
///
/// The public signals must carry the challenge. For placeholder proofs the
/// proof string is also recomputed, so an artifact whose signals were edited
/// after proving is rejected. Proofs from other provers are only checked on
/// their signals.
pub fn check_binding(artifact: &ProofArtifact, challenge: &str) -> bool {
    if artifact.public_signals.challenge != challenge {
        return false;
    }
    if artifact.proof.starts_with(PLACEHOLDER_PROOF_PREFIX) {
        return placeholder_proof(&artifact.public_signals)
            .map(|expected| expected == artifact.proof)
            .unwrap_or(false);
    }
    !artifact.proof.is_empty()
}
