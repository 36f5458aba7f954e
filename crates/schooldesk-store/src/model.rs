//! School record model.
//!
//! [`School`] mirrors a row of the `schools` table, including internal
//! billing fields that must never leave the server. HTTP responses are built
//! from explicit projections in the server crate, not from this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Subscription status ──────────────────────────────────────────────

/// Statuses that block a new trial from being activated.
pub const TRIAL_BLOCKING_STATUSES: [&str; 2] = ["active", "trial"];

/// Commercial state of a school account.
///
/// Statuses this crate does not know about are kept verbatim in
/// [`SubscriptionStatus::Other`] so they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    #[default]
    None,
    Trial,
    Active,
    Cancelled,
    Expired,
    PastDue,
    Other(String),
}

impl SubscriptionStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::PastDue => "past_due",
            Self::Other(s) => s,
        }
    }

    /// Whether a school in this status may start a trial.
    #[must_use]
    pub fn permits_trial(&self) -> bool {
        !TRIAL_BLOCKING_STATUSES.contains(&self.as_str())
    }
}

impl From<String> for SubscriptionStatus {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "" | "none" => Self::None,
            "trial" => Self::Trial,
            "active" => Self::Active,
            "cancelled" | "canceled" => Self::Cancelled,
            "expired" => Self::Expired,
            "past_due" => Self::PastDue,
            _ => Self::Other(value),
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(value: SubscriptionStatus) -> Self {
        match value {
            SubscriptionStatus::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Schools ──────────────────────────────────────────────────────────

/// A school (tenant) record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct School {
    pub id: Uuid,
    pub school_code: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "postgres", sqlx(try_from = "String"))]
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub subscription_plan: Option<String>,
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub student_count: i32,
    #[serde(default)]
    pub student_limit: Option<i32>,
    #[serde(default)]
    pub trial_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_billing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub billing_customer_id: Option<String>,
    #[serde(default)]
    pub internal_notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

// ── Trial activation ─────────────────────────────────────────────────

/// Parameters for the conditional `none → trial` mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialActivationRequest {
    /// Plan name stored in `subscription_plan`.
    pub plan_name: String,
    /// Already clamped student capacity.
    pub student_limit: i32,
    pub trial_end_date: DateTime<Utc>,
    /// Contact overrides; `None` leaves the stored value untouched.
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Result of [`SchoolStore::activate_trial`](crate::SchoolStore::activate_trial).
#[derive(Debug, Clone, PartialEq)]
pub enum TrialActivation {
    /// The trial was applied; holds the updated record.
    Activated(School),
    /// The school was already `trial` or `active`; holds the unchanged record.
    AlreadySubscribed(School),
    /// No school with that id exists.
    NotFound,
}
