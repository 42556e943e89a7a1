// src/zkp/predicate.rs
//! Predicates over credential claims.
//!
//! Claims are read from the credential JWT payload without checking the
//! issuer's signature. That is acceptable only while the proof is a
//! placeholder; a real prover must verify the issuer key first.

use crate::error::{Result, WalletError};
use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A boolean fact derivable from a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// Holder's completed age is at least the given number of years.
    AgeOver(u32),
}

impl FromStr for Predicate {
    type Err = WalletError;

    /// Parses `over_<N>`, e.g. `over_18`.
    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("over_")
            .and_then(|n| n.parse::<u32>().ok())
            .map(Predicate::AgeOver)
            .ok_or_else(|| WalletError::UnsupportedPredicate(s.to_string()))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::AgeOver(years) => write!(f, "over_{years}"),
        }
    }
}

/// Decodes the payload segment of a compact JWT. No signature check.
///
/// Accepts the URL-safe alphabet and, failing that, the standard one.
pub fn decode_jwt_payload(jwt: &str) -> Option<Value> {
    let payload = jwt.split('.').nth(1)?.trim_end_matches('=');
    let bytes = base64::decode_config(payload, base64::URL_SAFE_NO_PAD)
        .or_else(|_| base64::decode_config(payload, base64::STANDARD_NO_PAD))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Extracts the holder's date of birth from `vc.credentialSubject`.
///
/// Accepts `dob` or `birthDate`, formatted `YYYY-MM-DD` or RFC 3339.
///
/// # Errors
/// `ClaimMissing` when the JWT cannot be decoded or carries no usable date.
pub fn birth_date(credential_jwt: &str) -> Result<NaiveDate> {
    let payload = decode_jwt_payload(credential_jwt)
        .ok_or_else(|| WalletError::ClaimMissing("credential JWT payload is unreadable".into()))?;
    let subject = &payload["vc"]["credentialSubject"];
    let raw = subject["dob"]
        .as_str()
        .or_else(|| subject["birthDate"].as_str())
        .ok_or_else(|| WalletError::ClaimMissing("dob".into()))?;

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .ok_or_else(|| WalletError::ClaimMissing(format!("dob is not a date: {raw}")))
}

/// Completed years between `birth` and `today`. A birthday not yet reached
/// this year does not count.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

impl Predicate {
    /// Evaluates the predicate against a credential as of `today`.
    pub fn evaluate(&self, credential_jwt: &str, today: NaiveDate) -> Result<bool> {
        match self {
            Predicate::AgeOver(years) => {
                let birth = birth_date(credential_jwt)?;
                Ok(i64::from(age_on(birth, today)) >= i64::from(*years))
            }
        }
    }
}
