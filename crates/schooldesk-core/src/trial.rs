//! Trial signup policy.
//!
//! Turns a signup payload into the parameters of the guarded `none → trial`
//! store mutation. The student capacity of a trial is capped at
//! [`TRIAL_STUDENT_CEILING`]; a missing or non-positive request gets the
//! full ceiling.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use schooldesk_store::TrialActivationRequest;

use crate::error::TrialError;

/// Maximum student capacity granted by a trial.
pub const TRIAL_STUDENT_CEILING: i32 = 75;

/// Plan recorded when the signup does not name one.
pub const DEFAULT_TRIAL_PLAN: &str = "starter";

/// Default trial length in days.
pub const DEFAULT_TRIAL_DAYS: i64 = 30;

/// Longest trial the policy will grant.
pub const MAX_TRIAL_DAYS: i64 = 365;

/// JSON body of `POST /api/trial/signup`.
///
/// Web forms send numbers as strings and integers as floats, so every field
/// is parsed leniently: a value of the wrong shape is treated as absent
/// rather than failing the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSignup {
    #[serde(default, deserialize_with = "lenient_id")]
    pub school_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub school_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub plan_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub plan_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub student_count: Option<i64>,
}

/// Strings as given; numeric ids (school codes typed as numbers) as text.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Finite, non-negative prices from numbers or numeric strings (`"49.00"`,
/// `"$49"`).
fn lenient_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let price = match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(price.filter(|p| p.is_finite() && *p >= 0.0))
}

/// Whole student counts from integers, floats (truncated) or numeric strings.
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate_count)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_count))
        }
        _ => None,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_count(n: f64) -> Option<i64> {
    // Float-to-int `as` saturates at the i64 bounds.
    n.is_finite().then(|| n.trunc() as i64)
}

/// Clamp a requested student count to the trial ceiling.
#[must_use]
pub fn clamp_student_limit(requested: Option<i64>) -> i32 {
    match requested {
        Some(n) if n > 0 => i32::try_from(n.min(i64::from(TRIAL_STUDENT_CEILING)))
            .unwrap_or(TRIAL_STUDENT_CEILING),
        _ => TRIAL_STUDENT_CEILING,
    }
}

/// Blank strings from web forms count as absent.
fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Trial terms applied to every activation.
#[derive(Debug, Clone, Copy)]
pub struct TrialPolicy {
    pub trial_days: i64,
}

impl Default for TrialPolicy {
    fn default() -> Self {
        Self {
            trial_days: DEFAULT_TRIAL_DAYS,
        }
    }
}

impl TrialPolicy {
    #[must_use]
    pub fn new(trial_days: i64) -> Self {
        Self { trial_days }
    }

    /// Build the store mutation for `signup`, starting the trial at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TrialError::InvalidLength`] if `trial_days` is outside
    /// `1..=MAX_TRIAL_DAYS` or the end date would overflow.
    pub fn activation_request(
        &self,
        signup: &TrialSignup,
        now: DateTime<Utc>,
    ) -> Result<TrialActivationRequest, TrialError> {
        let invalid = || TrialError::InvalidLength {
            days: self.trial_days,
        };
        if !(1..=MAX_TRIAL_DAYS).contains(&self.trial_days) {
            return Err(invalid());
        }
        let trial_end_date = Duration::try_days(self.trial_days)
            .and_then(|length| now.checked_add_signed(length))
            .ok_or_else(invalid)?;

        Ok(TrialActivationRequest {
            plan_name: non_blank(signup.plan_name.as_ref())
                .unwrap_or_else(|| DEFAULT_TRIAL_PLAN.to_owned()),
            student_limit: clamp_student_limit(signup.student_count),
            trial_end_date,
            email: non_blank(signup.email.as_ref()),
            name: non_blank(signup.school_name.as_ref()),
            phone: non_blank(signup.phone.as_ref()),
        })
    }
}
