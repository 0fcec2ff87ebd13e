//! Input adaptation for lead submissions.
//!
//! Browsers and chat widgets send numbers as strings, booleans as "yes", and
//! leave fields blank. Everything is normalized here so the scoring engine
//! only ever sees clean optional values.

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::models::LeadProfile;
use crate::scoring::Qualification;

const DEFAULT_INTAKE: &str = "September";

/// Column widths of the `leads` table.
const FIELD_LIMITS: [(&str, usize); 6] = [
    ("name", 100),
    ("phone", 32),
    ("email", 254),
    ("country_interest", 50),
    ("course_interest", 100),
    ("intake", 20),
];

/// Raw lead fields as submitted by the chat funnel or staff.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    /// Free-text profile the student typed into the chat.
    #[serde(default)]
    pub user_summary: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country_interest: Option<String>,
    #[serde(default)]
    pub course_interest: Option<String>,
    #[serde(default)]
    pub ielts_score: Value,
    #[serde(default)]
    pub budget: Value,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub backlogs: Value,
    #[serde(default)]
    pub intake: Option<String>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads an IELTS band from a JSON number or numeric string.
///
/// Anything unparseable or non-finite becomes `None`.
pub fn parse_ielts(value: &Value) -> Option<f64> {
    let band = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    band.is_finite().then_some(band)
}

/// Reads a budget in lakhs.
///
/// JSON numbers truncate toward zero; strings must be integer text, so
/// `"22.5"` is treated as not provided.
pub fn parse_budget(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn parse_backlogs(value: &Value) -> Result<bool, AppError> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "no" | "0" => Ok(false),
            "true" | "yes" | "1" => Ok(true),
            other => Err(AppError::BadRequest(format!(
                "Invalid backlogs value '{}' (expected yes/no)",
                other
            ))),
        },
        other => Err(AppError::BadRequest(format!(
            "Invalid backlogs value {}",
            other
        ))),
    }
}

pub fn parse_qualification(value: Option<&str>) -> Result<Qualification, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(Qualification::default()),
        Some(raw) => Qualification::from_str(raw).map_err(AppError::BadRequest),
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("email regex is valid")
    })
}

/// Format check for a contact email: `local@domain.tld`, at most 254 chars.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

/// Normalizes a phone number to E.164 when it parses for `region`.
///
/// Numbers that do not parse are kept as typed (trimmed); the phone field is
/// free text and must never block a lead.
pub fn normalize_phone(raw: &str, region: &str) -> String {
    let raw = raw.trim();
    let country = CountryId::from_str(region).ok();

    match phonenumber::parse(country, raw) {
        Ok(number) if phonenumber::is_valid(&number) => {
            number.format().mode(Mode::E164).to_string()
        }
        _ => {
            tracing::debug!("Keeping unparseable phone as entered: {}", raw);
            raw.to_string()
        }
    }
}

fn check_lengths(profile: &LeadProfile) -> Result<(), AppError> {
    for (field, limit) in FIELD_LIMITS {
        let value = match field {
            "name" => profile.name.as_str(),
            "phone" => profile.phone.as_str(),
            "email" => profile.email.as_deref().unwrap_or_default(),
            "country_interest" => profile.country_interest.as_str(),
            "course_interest" => profile.course_interest.as_str(),
            _ => profile.intake.as_str(),
        };
        if value.chars().count() > limit {
            return Err(AppError::BadRequest(format!(
                "{} must be at most {} characters",
                field, limit
            )));
        }
    }
    Ok(())
}

impl LeadSubmission {
    /// The chat funnel's free-text summary, if one was given.
    pub fn summary(&self) -> Option<String> {
        trimmed(&self.user_summary)
    }

    /// Validates required fields and normalizes the rest.
    ///
    /// `name` and `phone` are required. Numeric scoring inputs that fail to
    /// parse are treated as not provided.
    pub fn into_profile(self, phone_region: &str) -> Result<LeadProfile, AppError> {
        let (Some(name), Some(phone)) = (trimmed(&self.name), trimmed(&self.phone)) else {
            return Err(AppError::BadRequest("Missing required fields.".to_string()));
        };

        let email = match trimmed(&self.email) {
            Some(email) if is_valid_email(&email) => Some(email.to_lowercase()),
            Some(email) => {
                return Err(AppError::BadRequest(format!(
                    "Invalid email address '{}'",
                    email
                )))
            }
            None => None,
        };

        let ielts_score = parse_ielts(&self.ielts_score);
        if ielts_score.is_none() && !self.ielts_score.is_null() {
            tracing::debug!("Unreadable IELTS score {} treated as absent", self.ielts_score);
        }
        let budget = parse_budget(&self.budget);
        if budget.is_none() && !self.budget.is_null() {
            tracing::debug!("Unreadable budget {} treated as absent", self.budget);
        }

        let profile = LeadProfile {
            name,
            email,
            phone: normalize_phone(&phone, phone_region),
            country_interest: trimmed(&self.country_interest).unwrap_or_default(),
            course_interest: trimmed(&self.course_interest).unwrap_or_default(),
            ielts_score,
            budget,
            qualification: parse_qualification(self.qualification.as_deref())?,
            backlogs: parse_backlogs(&self.backlogs)?,
            intake: trimmed(&self.intake).unwrap_or_else(|| DEFAULT_INTAKE.to_string()),
        };
        check_lengths(&profile)?;
        Ok(profile)
    }
}
