use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::scoring::{self, Assessment, Destination, LeadQuality, Qualification, ScoringInput};

// ============ Database Models ============

/// Counsellor pipeline stage. Any stage may move to any other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "crm_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CrmStatus {
    #[default]
    New,
    Contacted,
    Followup,
    Converted,
    Lost,
}

impl CrmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrmStatus::New => "new",
            CrmStatus::Contacted => "contacted",
            CrmStatus::Followup => "followup",
            CrmStatus::Converted => "converted",
            CrmStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for CrmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrmStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(CrmStatus::New),
            "contacted" => Ok(CrmStatus::Contacted),
            "followup" | "follow-up" => Ok(CrmStatus::Followup),
            "converted" => Ok(CrmStatus::Converted),
            "lost" => Ok(CrmStatus::Lost),
            other => Err(format!("Unknown CRM status '{}'", other)),
        }
    }
}

/// A prospective student as stored in `leads`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub country_interest: String,
    pub course_interest: String,
    pub ielts_score: Option<f64>,
    /// Budget in lakhs.
    pub budget: Option<i64>,
    pub qualification: Qualification,
    pub backlogs: bool,
    pub intake: String,
    pub lead_score: i32,
    pub recommended_country: Destination,
    pub lead_quality: LeadQuality,
    pub crm_status: CrmStatus,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn scoring_input(&self) -> ScoringInput {
        ScoringInput {
            ielts_score: self.ielts_score,
            budget: self.budget,
            qualification: self.qualification,
            backlogs: self.backlogs,
        }
    }

    /// Whether the stored derived fields match what the inputs produce today.
    pub fn is_assessment_current(&self) -> bool {
        scoring::assess(&self.scoring_input())
            == Assessment {
                lead_score: self.lead_score,
                recommended_country: self.recommended_country,
                lead_quality: self.lead_quality,
            }
    }
}

/// Staff member a lead can be assigned to.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Counsellor {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

// ============ Write Models ============

/// Identity and profile fields of a lead, already normalized.
///
/// Used by every write that can change a scoring input; derived fields are
/// never accepted from callers.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadProfile {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub country_interest: String,
    pub course_interest: String,
    pub ielts_score: Option<f64>,
    pub budget: Option<i64>,
    pub qualification: Qualification,
    pub backlogs: bool,
    pub intake: String,
}

impl LeadProfile {
    pub fn scoring_input(&self) -> ScoringInput {
        ScoringInput {
            ielts_score: self.ielts_score,
            budget: self.budget,
            qualification: self.qualification,
            backlogs: self.backlogs,
        }
    }

    pub fn assessment(&self) -> Assessment {
        scoring::assess(&self.scoring_input())
    }
}

/// Body of `POST /api/v1/leads/:id/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowUpdate {
    pub status: String,
    /// Omitted or null clears the assignment.
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCounsellor {
    pub username: String,
    pub full_name: String,
}

// ============ Query Models ============

/// Query string of the lead list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadListParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub quality: Option<String>,
    pub country: Option<String>,
    /// Raw page number; non-numeric values fall back to the first page.
    pub page: Option<String>,
}

/// Validated list filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub search: Option<String>,
    pub status: Option<CrmStatus>,
    pub quality: Option<LeadQuality>,
    pub country: Option<Destination>,
}

impl LeadListParams {
    /// Parses enum filters, rejecting unknown values. Blank values mean "no filter".
    pub fn to_filter(&self) -> Result<LeadFilter, String> {
        fn non_blank(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        Ok(LeadFilter {
            search: non_blank(&self.q).map(str::to_string),
            status: non_blank(&self.status).map(str::parse).transpose()?,
            quality: non_blank(&self.quality).map(str::parse).transpose()?,
            country: non_blank(&self.country).map(str::parse).transpose()?,
        })
    }
}

// ============ Response Models ============

/// One page of results with the same shape as a classic paginator.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: i64,
    pub hot: i64,
    pub warm: i64,
    pub cold: i64,
    pub converted: i64,
}

/// Monthly chart series plus quality split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub labels: Vec<String>,
    pub lead_data: Vec<i64>,
    pub converted_data: Vec<i64>,
    pub hot: i64,
    pub warm: i64,
    pub cold: i64,
}

/// Reply of the public intake funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeResponse {
    pub success: bool,
    pub lead_id: Uuid,
    pub ai_reply: String,
    pub score: i32,
    pub recommended_country: Destination,
    pub lead_quality: LeadQuality,
}
