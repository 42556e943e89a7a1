// src/services/credential_issuer.rs
//! Credential issuance protocol (holder side).
//!
//! One issuance round:
//! 1. Discover the issuer via `/.well-known/openid-credential-issuer`
//! 2. Build and canonicalize a proof-of-control payload, sign it
//! 3. Submit claims + proof to the issuer's proof-carrying endpoint
//! 4. Persist the returned credential
//!
//! Nothing is written to the store unless the issuer answers with success
//! and a well-formed credential, and only if the wallet was not cleared or
//! replaced while the round was running.
//!
//! The proof is Ed25519: `proofSignature` is `hex(public_key || signature)`
//! and `holderAddress` is the keccak-derived address of the Ed25519 public
//! key. An issuer that expects a 65-byte EIP-191 secp256k1 signature and
//! recovers the signer address from it will reject these proofs.

use crate::error::{Result, WalletError};
use crate::models::credential::{
    IssueResponse, IssueWithProofRequest, IssuerMetadata, ProofPayload, StoredCredential,
};
use crate::services::http::{endpoint, normalize_base_url, rejection_reason};
use crate::utils::serialization::canonical_string;
use crate::wallet::credential_storage::CredentialStore;
use crate::wallet::key_management::{Identity, KeyManager};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;

pub const DISCOVERY_PATH: &str = "/.well-known/openid-credential-issuer";
pub const DEFAULT_PROOF_PATH: &str = "/issue-with-proof";

/// Signed proof of control, ready to submit.
#[derive(Debug, Clone)]
pub struct SignedProof {
    /// Canonical JSON of the payload; the exact bytes that were signed.
    pub payload: String,
    pub signature: String,
}

/// Builds the canonical proof payload for `holder` and signs it.
pub fn build_signed_proof(
    holder: &Identity,
    claims: &Value,
    timestamp: DateTime<Utc>,
) -> Result<SignedProof> {
    let payload = ProofPayload {
        holder_did: holder.did.to_string(),
        holder_address: holder.key_pair.address.clone(),
        passport_data: claims.clone(),
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let canonical = canonical_string(&payload)?;
    let signature =
        KeyManager::from_private_key(&holder.key_pair.private_key)?.sign_message(canonical.as_bytes());
    Ok(SignedProof {
        payload: canonical,
        signature,
    })
}

/// Holder-side client for the issuance protocol.
#[derive(Clone)]
pub struct IssuanceClient {
    http: reqwest::Client,
    store: Arc<CredentialStore>,
}

impl IssuanceClient {
    pub fn new(http: reqwest::Client, store: Arc<CredentialStore>) -> Self {
        Self { http, store }
    }

    /// Fetches and validates the issuer's discovery document.
    ///
    /// # Errors
    /// - `IssuerUnreachable` if the request cannot be sent or read
    /// - `IssuerMetadataInvalid` on a non-success status, a non-JSON body or a
    ///   missing `credential_endpoint`
    pub async fn fetch_metadata(&self, issuer_base_url: &str) -> Result<IssuerMetadata> {
        let url = endpoint(issuer_base_url, DISCOVERY_PATH);
        let unreachable = |source| WalletError::IssuerUnreachable {
            endpoint: url.clone(),
            source,
        };

        let response = self.http.get(&url).send().await.map_err(unreachable)?;
        if !response.status().is_success() {
            let reason = rejection_reason(response).await;
            return Err(WalletError::IssuerMetadataInvalid { endpoint: url, reason });
        }
        let body = response.bytes().await.map_err(unreachable)?;

        let metadata: IssuerMetadata =
            serde_json::from_slice(&body).map_err(|e| WalletError::IssuerMetadataInvalid {
                endpoint: url.clone(),
                reason: format!("not a metadata document: {e}"),
            })?;

        if metadata
            .credential_endpoint
            .as_deref()
            .map_or(true, |e| e.trim().is_empty())
        {
            return Err(WalletError::IssuerMetadataInvalid {
                endpoint: url,
                reason: "credential_endpoint is missing".into(),
            });
        }
        debug!("resolved issuer metadata from {url}");
        Ok(metadata)
    }

    /// Runs a full issuance round and stores the resulting credential.
    pub async fn issue(
        &self,
        issuer_base_url: &str,
        holder: &Identity,
        claims: Value,
    ) -> Result<StoredCredential> {
        let generation = self.store.generation()?;
        self.issue_in_generation(generation, issuer_base_url, holder, claims)
            .await
    }

    /// [`IssuanceClient::issue`] for a round that began in store `generation`.
    ///
    /// # Errors
    /// `WalletChanged` if the store moved to another generation before the
    /// credential could be persisted.
    pub async fn issue_in_generation(
        &self,
        generation: u64,
        issuer_base_url: &str,
        holder: &Identity,
        claims: Value,
    ) -> Result<StoredCredential> {
        let metadata = self.fetch_metadata(issuer_base_url).await?;
        let target = metadata
            .credential_endpoint_with_proof
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(normalize_base_url)
            .unwrap_or_else(|| endpoint(issuer_base_url, DEFAULT_PROOF_PATH));

        let proof = build_signed_proof(holder, &claims, Utc::now())?;
        let request = IssueWithProofRequest {
            holder_did: holder.did.to_string(),
            passport_data: claims,
            holder_address: holder.key_pair.address.clone(),
            proof_payload: proof.payload,
            proof_signature: proof.signature,
        };

        let response = self
            .http
            .post(&target)
            .json(&request)
            .send()
            .await
            .map_err(|source| WalletError::IssuerUnreachable {
                endpoint: target.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let reason = rejection_reason(response).await;
            warn!("issuance rejected by {target}: {reason}");
            return Err(WalletError::IssuanceRejected { endpoint: target, reason });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| WalletError::IssuerUnreachable {
                endpoint: target.clone(),
                source,
            })?;
        let issued: IssueResponse =
            serde_json::from_slice(&body).map_err(|e| WalletError::IssuanceRejected {
                endpoint: target.clone(),
                reason: format!("malformed issuer response: {e}"),
            })?;

        let stored = issued.into_stored(holder.did.to_string(), Utc::now());
        self.store.put_in_generation(stored.clone(), generation)?;
        info!("stored credential {} from {}", stored.cred_id, stored.issuer_did);
        Ok(stored)
    }
}
