// src/services/verifier.rs
//! Challenge-response verification protocol (holder side).
//!
//! Each attempt walks `Init -> Challenged -> Proven -> Decided`, or lands in
//! `Failed` from any step. A still-valid cached decision token short-circuits
//! `Init` straight to `Decided` without touching the network.

use crate::error::{Result, WalletError};
use crate::models::credential::{Challenge, StoredDecisionToken, VerifyRequest, VerifyResponse};
use crate::services::http::{endpoint, normalize_base_url, rejection_reason};
use crate::wallet::credential_storage::{CredentialStore, TokenCriteria};
use crate::zkp::predicate::Predicate;
use crate::zkp::proof_generation::PredicateProver;
use crate::zkp::proof_verification::check_binding;
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

pub const CHALLENGE_PATH: &str = "/verify/challenge";
pub const DECISION_PATH: &str = "/verify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Init,
    Challenged,
    Proven,
    Decided,
    Failed,
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationState::Init => "INIT",
            VerificationState::Challenged => "CHALLENGED",
            VerificationState::Proven => "PROVEN",
            VerificationState::Decided => "DECIDED",
            VerificationState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one verification attempt.
struct Attempt<'a> {
    cred_id: &'a str,
    state: VerificationState,
}

impl<'a> Attempt<'a> {
    fn new(cred_id: &'a str) -> Self {
        debug!("verification of {cred_id}: {}", VerificationState::Init);
        Self {
            cred_id,
            state: VerificationState::Init,
        }
    }

    fn advance(&mut self, next: VerificationState) {
        debug!("verification of {}: {} -> {next}", self.cred_id, self.state);
        self.state = next;
    }
}

/// Holder-side client for the verification protocol.
#[derive(Clone)]
pub struct VerificationClient {
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    prover: Arc<dyn PredicateProver>,
}

impl VerificationClient {
    pub fn new(
        http: reqwest::Client,
        store: Arc<CredentialStore>,
        prover: Arc<dyn PredicateProver>,
    ) -> Self {
        Self { http, store, prover }
    }

    /// Proves `predicate` for credential `cred_id` to the verifier at
    /// `verifier_url` and returns the resulting decision token.
    ///
    /// # Errors
    /// - `CredentialNotFound` if the wallet does not hold `cred_id`
    /// - `VerificationFailed` on any network failure or verifier rejection
    /// - `WalletChanged` if the wallet was cleared or replaced mid-round
    ///
    /// The store is only written after the verifier's success response.
    pub async fn verify(
        &self,
        cred_id: &str,
        verifier_url: &str,
        predicate: Predicate,
    ) -> Result<StoredDecisionToken> {
        let mut attempt = Attempt::new(cred_id);
        let result = self.run(&mut attempt, cred_id, verifier_url, predicate).await;
        match &result {
            Ok(_) => attempt.advance(VerificationState::Decided),
            Err(e) => {
                warn!("verification of {cred_id} failed: {e}");
                attempt.advance(VerificationState::Failed);
            }
        }
        result
    }

    async fn run(
        &self,
        attempt: &mut Attempt<'_>,
        cred_id: &str,
        verifier_url: &str,
        predicate: Predicate,
    ) -> Result<StoredDecisionToken> {
        let generation = self.store.generation()?;
        let base = normalize_base_url(verifier_url);
        let claim = predicate.to_string();

        let credential = self
            .store
            .credential(cred_id)?
            .ok_or_else(|| WalletError::CredentialNotFound(cred_id.to_string()))?;

        let criteria = TokenCriteria {
            cred_id: Some(cred_id.to_string()),
            verifier_url: Some(base.clone()),
            required_claims: vec![claim.clone()],
        };
        if let Some(cached) = self.store.get_valid(&criteria)? {
            info!("using cached decision token for {cred_id} at {base}");
            return Ok(cached);
        }

        let challenge_url = endpoint(&base, CHALLENGE_PATH);
        let challenge: Challenge = self.get_json(&challenge_url).await?;
        if challenge.challenge.is_empty() {
            return Err(failed(&challenge_url, "verifier issued an empty challenge"));
        }
        attempt.advance(VerificationState::Challenged);

        let artifact = self
            .prover
            .prove(&credential, predicate, &challenge.challenge)?;
        if !check_binding(&artifact, &challenge.challenge) {
            return Err(failed(&base, "proof is not bound to the issued challenge"));
        }

        let request = VerifyRequest {
            holder_did: credential.holder_did.clone(),
            challenge: challenge.challenge,
            commitment_jwt: credential.commitment_jwt.clone(),
            proof: artifact.proof,
            public_signals: serde_json::to_value(&artifact.public_signals)?,
            requested_claims: vec![claim],
        };
        attempt.advance(VerificationState::Proven);

        let decision_url = endpoint(&base, DECISION_PATH);
        let response = self
            .http
            .post(&decision_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| failed(&decision_url, e))?;
        let decision: VerifyResponse = read_json(&decision_url, response).await?;

        let now = Utc::now();
        let expires_at = Duration::try_seconds(decision.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| failed(&decision_url, "expiresIn out of range"))?;
        let token = StoredDecisionToken {
            cred_id: cred_id.to_string(),
            verifier_url: base,
            decision_token: decision.decision_token,
            assurance_level: decision.assurance_level,
            verified_claims: decision.verified_claims.into_iter().collect(),
            expires_at,
            received_at: now,
        };
        self.store.put_in_generation(token.clone(), generation)?;
        info!(
            "stored decision token for {} (assurance {}, expires {})",
            token.cred_id, token.assurance_level, token.expires_at
        );
        Ok(token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| failed(url, e))?;
        read_json(url, response).await
    }
}

fn failed(endpoint: &str, reason: impl fmt::Display) -> WalletError {
    WalletError::VerificationFailed {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    }
}

async fn read_json<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(failed(url, rejection_reason(response).await));
    }
    let body = response.bytes().await.map_err(|e| failed(url, e))?;
    serde_json::from_slice(&body).map_err(|e| failed(url, format!("malformed response: {e}")))
}
