//! One-click unsubscribe tokens.
//!
//! Token format: `base64url(userId:kind:hmac16hex)` without padding, where
//! `hmac16hex` is the first 16 lowercase hex chars of
//! HMAC-SHA256(secret, "userId:kind"). The token appears in public
//! `/unsubscribe?token=...` URLs, so the format must stay stable.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of the truncated hex signature.
const SIGNATURE_HEX_LEN: usize = 16;

/// What a token unsubscribes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeKind {
    All,
    StatusChanges,
    Reminders,
    TeamUpdates,
}

impl UnsubscribeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::StatusChanges => "status_changes",
            Self::Reminders => "reminders",
            Self::TeamUpdates => "team_updates",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "status_changes" => Some(Self::StatusChanges),
            "reminders" => Some(Self::Reminders),
            "team_updates" => Some(Self::TeamUpdates),
            _ => None,
        }
    }

    /// Human description for confirmation pages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::All => "all compliance emails",
            Self::StatusChanges => "status change digests",
            Self::Reminders => "due date reminders",
            Self::TeamUpdates => "team updates",
        }
    }
}

/// A verified token's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeClaims {
    pub user_id: String,
    pub kind: UnsubscribeKind,
}

/// Issues and verifies unsubscribe tokens with a shared secret.
#[derive(Clone)]
pub struct UnsubscribeSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for UnsubscribeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsubscribeSigner").finish_non_exhaustive()
    }
}

impl UnsubscribeSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn signature(&self, user_id: &str, kind: &str) -> String {
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(user_id.as_bytes());
        mac.update(b":");
        mac.update(kind.as_bytes());
        let mut sig = hex::encode(mac.finalize().into_bytes());
        sig.truncate(SIGNATURE_HEX_LEN);
        sig
    }

    /// Issue a token for (user, kind).
    pub fn generate(&self, user_id: &str, kind: UnsubscribeKind) -> String {
        let sig = self.signature(user_id, kind.as_str());
        URL_SAFE_NO_PAD.encode(format!("{}:{}:{}", user_id, kind.as_str(), sig))
    }

    /// Verify a token. Returns `None` for anything tampered or malformed.
    pub fn verify(&self, token: &str) -> Option<UnsubscribeClaims> {
        let decoded = URL_SAFE_NO_PAD.decode(token.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;

        // user ids may themselves contain ':', so split from the right
        let mut parts = text.rsplitn(3, ':');
        let sig = parts.next()?;
        let kind_str = parts.next()?;
        let user_id = parts.next()?;

        if user_id.is_empty() || sig.len() != SIGNATURE_HEX_LEN {
            return None;
        }
        let kind = UnsubscribeKind::parse(kind_str)?;

        let expected = self.signature(user_id, kind_str);
        if !bool::from(expected.as_bytes().ct_eq(sig.as_bytes())) {
            return None;
        }

        Some(UnsubscribeClaims {
            user_id: user_id.to_string(),
            kind,
        })
    }
}
