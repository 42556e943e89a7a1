// src/models/credential.rs
//! Credential, decision-token and wire data models.
//!
//! Stored records use camelCase field names so persisted collections and the
//! issuer/verifier payloads share one JSON vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A credential as held in the wallet after a successful issuance round.
///
/// Immutable once stored; re-issuance with the same `cred_id` replaces the
/// previous record wholesale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub cred_id: String,
    pub issuer_did: String,
    pub status: String,
    /// Signed credential as a compact JWT (`header.payload.signature`).
    pub credential_jwt: String,
    pub commitment_hash: String,
    pub commitment_jwt: String,
    pub holder_did: String,
    pub received_at: DateTime<Utc>,
}

/// A verifier's decision cached for reuse by relying parties.
///
/// Keyed by `(cred_id, verifier_url)`; never valid once `expires_at` has passed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredDecisionToken {
    pub cred_id: String,
    pub verifier_url: String,
    pub decision_token: String,
    pub assurance_level: String,
    pub verified_claims: BTreeSet<String>,
    pub expires_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl StoredDecisionToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issuer discovery document served at `/.well-known/openid-credential-issuer`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct IssuerMetadata {
    #[serde(default)]
    pub issuer_did: Option<String>,
    #[serde(default)]
    pub credential_endpoint: Option<String>,
    #[serde(default)]
    pub credential_endpoint_with_proof: Option<String>,
}

/// The object whose canonical serialization is signed during issuance.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProofPayload {
    pub holder_did: String,
    pub holder_address: String,
    pub passport_data: Value,
    pub timestamp: String,
}

/// Body posted to the issuer's proof-carrying credential endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssueWithProofRequest {
    pub holder_did: String,
    pub passport_data: Value,
    pub holder_address: String,
    /// Canonical JSON string of the [`ProofPayload`], exactly as signed.
    pub proof_payload: String,
    pub proof_signature: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub cred_id: String,
    pub issuer_did: String,
    pub status: String,
    pub credential_jwt: String,
    pub commitment_hash: String,
    pub commitment_jwt: String,
}

impl IssueResponse {
    pub fn into_stored(self, holder_did: String, received_at: DateTime<Utc>) -> StoredCredential {
        StoredCredential {
            cred_id: self.cred_id,
            issuer_did: self.issuer_did,
            status: self.status,
            credential_jwt: self.credential_jwt,
            commitment_hash: self.commitment_hash,
            commitment_jwt: self.commitment_jwt,
            holder_did,
            received_at,
        }
    }
}

/// One-time challenge handed out by a verifier. Never persisted.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub challenge: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub holder_did: String,
    pub challenge: String,
    pub commitment_jwt: String,
    pub proof: String,
    pub public_signals: Value,
    pub requested_claims: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub decision_token: String,
    pub assurance_level: String,
    #[serde(default)]
    pub verified_claims: Vec<String>,
    #[serde(default)]
    pub expires_in: i64,
}
