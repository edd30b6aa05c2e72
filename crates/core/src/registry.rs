//! Company and director identifiers used for registry lookups.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::limits::{CIN_PATTERN, DIN_PATTERN};

static CIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CIN_PATTERN).expect("invalid CIN pattern"));

static DIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DIN_PATTERN).expect("invalid DIN pattern"));

/// Validated Company Identification Number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cin(String);

impl Cin {
    /// Parse a CIN, normalizing to uppercase.
    ///
    /// Format: `[LU]` + 5 digit industry code + 2 letter state + 4 digit
    /// year + 3 letter ownership + 6 digit registration number.
    pub fn parse(raw: &str) -> Result<Self> {
        let cin = raw.trim().to_uppercase();
        if !CIN_REGEX.is_match(&cin) {
            return Err(Error::validation(format!("invalid CIN: {}", raw)));
        }
        Ok(Self(cin))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Listed (`L`) vs unlisted (`U`) company.
    pub fn is_listed(&self) -> bool {
        self.0.starts_with('L')
    }
}

/// Validated Director Identification Number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Din(String);

impl Din {
    pub fn parse(raw: &str) -> Result<Self> {
        let din = raw.trim();
        if !DIN_REGEX.is_match(din) {
            return Err(Error::validation(format!("invalid DIN: {}", raw)));
        }
        Ok(Self(din.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
