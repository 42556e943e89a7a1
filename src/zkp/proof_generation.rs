// src/zkp/proof_generation.rs
//! Predicate proof generation.
//!
//! The [`PredicateProver`] trait is the seam where a real proving system
//! (e.g. a Groth16 age circuit) plugs in. [`PlaceholderProver`] evaluates the
//! predicate in the clear and emits an opaque attestation bound to the
//! verifier's challenge: the same credential proven against a different
//! challenge yields a different proof string.

use crate::error::{Result, WalletError};
use crate::models::credential::StoredCredential;
use crate::utils::crypto::hash_data;
use crate::utils::serialization::canonical_string;
use crate::zkp::predicate::Predicate;
use chrono::{NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_PROOF_PREFIX: &str = "poc-proof-";

/// Values the verifier sees alongside the proof.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicSignals {
    pub predicate: String,
    pub result: bool,
    pub challenge: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    pub proof: String,
    pub public_signals: PublicSignals,
}

/// Produces a proof that `predicate` holds for `credential`, bound to `challenge`.
pub trait PredicateProver: Send + Sync {
    fn prove(
        &self,
        credential: &StoredCredential,
        predicate: Predicate,
        challenge: &str,
    ) -> Result<ProofArtifact>;
}

/// Placeholder attestation: `poc-proof-` + keccak256 of the canonical public
/// signals.
pub fn placeholder_proof(signals: &PublicSignals) -> Result<String> {
    let canonical = canonical_string(signals)?;
    Ok(format!(
        "{PLACEHOLDER_PROOF_PREFIX}{}",
        hex::encode(hash_data(canonical.as_bytes()))
    ))
}

/// Evaluates predicates in the clear. Not zero-knowledge.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProver {
    reference_date: Option<NaiveDate>,
}

impl PlaceholderProver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates as of a fixed date instead of today (UTC).
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl PredicateProver for PlaceholderProver {
    /// A missing or unreadable date of birth resolves to a negative result
    /// rather than an error.
    fn prove(
        &self,
        credential: &StoredCredential,
        predicate: Predicate,
        challenge: &str,
    ) -> Result<ProofArtifact> {
        let result = match predicate.evaluate(&credential.credential_jwt, self.today()) {
            Ok(result) => result,
            Err(WalletError::ClaimMissing(claim)) => {
                warn!(
                    "credential {} lacks a usable claim ({claim}); {predicate} resolves to false",
                    credential.cred_id
                );
                false
            }
            Err(e) => return Err(e),
        };

        let public_signals = PublicSignals {
            predicate: predicate.to_string(),
            result,
            challenge: challenge.to_string(),
        };
        Ok(ProofArtifact {
            proof: placeholder_proof(&public_signals)?,
            public_signals,
        })
    }
}
