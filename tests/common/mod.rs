#![allow(dead_code)]

use chrono::Utc;
use did_wallet::{CredentialStore, StoredCredential, Wallet};
use serde_json::Value;
use std::sync::Arc;

pub fn wallet() -> Wallet {
    Wallet::new(
        Arc::new(CredentialStore::in_memory().unwrap()),
        reqwest::Client::new(),
    )
}

/// Compact JWT with the given payload and a dummy signature.
pub fn jwt_with(payload: &Value) -> String {
    let header = base64::encode_config(br#"{"alg":"EdDSA","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD);
    let body = base64::encode_config(payload.to_string(), base64::URL_SAFE_NO_PAD);
    format!("{header}.{body}.c2lnbmF0dXJl")
}

pub fn credential_with_dob(cred_id: &str, holder_did: &str, dob: &str) -> StoredCredential {
    let payload = serde_json::json!({"vc": {"credentialSubject": {"dob": dob}}});
    StoredCredential {
        cred_id: cred_id.to_string(),
        issuer_did: "did:key:z6MkIssuer".to_string(),
        status: "ISSUED".to_string(),
        credential_jwt: jwt_with(&payload),
        commitment_hash: "0xc0ffee".to_string(),
        commitment_jwt: "h.commitment.s".to_string(),
        holder_did: holder_did.to_string(),
        received_at: Utc::now(),
    }
}
