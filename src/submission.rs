//! Submission admission — validation, identity normalization, and the typed
//! rejection surface.
//!
//! `submit` is the single entry point for user submissions. It validates the
//! input shape without touching the datastore, normalizes the handle, and
//! hands the rest to the admission transaction in the db layer. Every
//! rejection path maps to exactly one [`SubmitError`] variant, which the HTTP
//! boundary turns into a user-facing message. Nothing is retried: a storage
//! failure aborts the whole submission and the caller must resubmit.

use crate::db::{AdmitDecision, Database};

/// Inclusive range of valid choosable numbers. The product ships 1–100, but
/// the bound is configuration, not logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRange {
    pub min: i32,
    pub max: i32,
}

impl NumberRange {
    pub fn contains(&self, n: i32) -> bool {
        n >= self.min && n <= self.max
    }
}

impl Default for NumberRange {
    fn default() -> Self {
        NumberRange { min: 1, max: 100 }
    }
}

/// Why a submission was rejected.
#[derive(Debug)]
pub enum SubmitError {
    /// Bad input shape: missing field or number outside the configured range.
    /// Raised before any datastore access.
    Validation(String),
    /// The handle already holds `max` entries.
    LimitExceeded { max: i32 },
    /// The chosen number is already claimed by another entry.
    NumberTaken,
    /// Any datastore failure during the admission transaction.
    Storage(anyhow::Error),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Validation(msg) => write!(f, "{}", msg),
            SubmitError::LimitExceeded { max } => {
                write!(f, "submission limit reached: max {} entries per handle", max)
            }
            SubmitError::NumberTaken => write!(f, "number already taken"),
            SubmitError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Storage(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Normalize a handle for use as identity and rate-limit key:
/// trim, strip one leading '@', lowercase.
pub fn normalize_handle(handle: &str) -> String {
    handle
        .trim()
        .strip_prefix('@')
        .unwrap_or(handle.trim())
        .to_lowercase()
}

/// Shape validation. Runs before any datastore access.
pub fn validate(range: NumberRange, handle: &str, wallet: &str, number: i32) -> Result<(), SubmitError> {
    if handle.trim().is_empty() {
        return Err(SubmitError::Validation("handle is required".into()));
    }
    if wallet.trim().is_empty() {
        return Err(SubmitError::Validation("wallet address is required".into()));
    }
    if !range.contains(number) {
        return Err(SubmitError::Validation(format!(
            "number must be between {} and {}",
            range.min, range.max
        )));
    }
    Ok(())
}

/// Full admission sequence: validate, normalize, then run the transactional
/// limit check + number claim + insert. Returns the new entry id.
pub async fn submit(
    db: &Database,
    range: NumberRange,
    handle: &str,
    wallet: &str,
    number: i32,
) -> Result<i64, SubmitError> {
    validate(range, handle, wallet, number)?;
    let handle = normalize_handle(handle);

    match db
        .admit_entry(&handle, wallet.trim(), number)
        .await
        .map_err(SubmitError::Storage)?
    {
        AdmitDecision::Admitted { id } => Ok(id),
        AdmitDecision::LimitExceeded { max } => Err(SubmitError::LimitExceeded { max }),
        AdmitDecision::NumberTaken => Err(SubmitError::NumberTaken),
    }
}
