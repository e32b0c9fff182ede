//! Single-use onboarding and recovery tokens

use chrono::{DateTime, Utc};

use super::user::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct InviteToken {
    pub id: String,
    pub token: String,
    pub email: String,
    pub role: Role,
    pub clinic_id: String,
    pub invited_by: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewInviteToken {
    pub token: String,
    pub email: String,
    pub role: Role,
    pub invited_by: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub clinic_id: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: String,
}

/// Tokens share one acceptance rule: unused and not yet expired.
pub trait OneTimeToken {
    fn expires_at(&self) -> DateTime<Utc>;
    fn used(&self) -> bool;

    fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used() && self.expires_at() > now
    }
}

impl OneTimeToken for InviteToken {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn used(&self) -> bool {
        self.used
    }
}

impl OneTimeToken for PasswordResetToken {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn used(&self) -> bool {
        self.used
    }
}
