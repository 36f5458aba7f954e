//! Response projections of the school record.
//!
//! These types are the only shapes in which school data leaves the server.
//! Each lists its fields explicitly; billing identifiers, internal notes and
//! timestamps on [`School`] are deliberately absent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use schooldesk_store::School;

/// Fields returned by `GET /api/school/{schoolId}`.
pub const SCHOOL_PROFILE_FIELDS: [&str; 15] = [
    "id",
    "name",
    "school_code",
    "email",
    "phone",
    "address",
    "city",
    "country",
    "subscription_status",
    "subscription_plan",
    "plan_type",
    "student_count",
    "student_limit",
    "trial_end_date",
    "next_billing_date",
];

/// Public view of a school for the lookup route.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolProfile {
    pub id: Uuid,
    pub name: String,
    pub school_code: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub subscription_status: String,
    pub subscription_plan: Option<String>,
    pub plan_type: Option<String>,
    pub student_count: i32,
    pub student_limit: Option<i32>,
    pub trial_end_date: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
}

impl From<&School> for SchoolProfile {
    fn from(s: &School) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            school_code: s.school_code.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            address: s.address.clone(),
            city: s.city.clone(),
            country: s.country.clone(),
            subscription_status: s.subscription_status.to_string(),
            subscription_plan: s.subscription_plan.clone(),
            plan_type: s.plan_type.clone(),
            student_count: s.student_count,
            student_limit: s.student_limit,
            trial_end_date: s.trial_end_date,
            next_billing_date: s.next_billing_date,
        }
    }
}

/// Subset echoed back after a trial activation.
#[derive(Debug, Clone, Serialize)]
pub struct TrialSchool {
    pub id: Uuid,
    pub name: String,
    pub school_code: String,
    pub subscription_status: String,
    pub subscription_plan: Option<String>,
    pub plan_type: Option<String>,
    pub student_limit: Option<i32>,
    pub trial_end_date: Option<DateTime<Utc>>,
}

impl From<&School> for TrialSchool {
    fn from(s: &School) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            school_code: s.school_code.clone(),
            subscription_status: s.subscription_status.to_string(),
            subscription_plan: s.subscription_plan.clone(),
            plan_type: s.plan_type.clone(),
            student_limit: s.student_limit,
            trial_end_date: s.trial_end_date,
        }
    }
}
