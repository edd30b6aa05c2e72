//! Users eligible to receive compliance mail, and their roles.

use serde::{Deserialize, Serialize};

/// Platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "superadmin" => Some(Self::Superadmin),
            _ => None,
        }
    }

    /// Whether this role receives reminder digests for its company.
    pub fn receives_reminders(&self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }
}

/// A user row relevant to recipient resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    /// `None` for platform-wide superadmins.
    pub company_id: Option<String>,
}

impl RecipientUser {
    /// Superadmin without company scope: receives mail for every company.
    pub fn is_platform_superadmin(&self) -> bool {
        self.role == Role::Superadmin && self.company_id.is_none()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}
