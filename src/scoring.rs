//! Lead scoring engine.
//!
//! Pure functions that turn a lead's submitted profile into the three derived
//! fields stored on every lead: an integer score, a recommended destination
//! and a quality category. Nothing here performs I/O.
//!
//! # Zero values
//!
//! An IELTS score or budget of exactly `0` is treated the same as a missing
//! value: it contributes no points and the budget falls back to the default
//! destination. Callers that need to distinguish "not provided" from a real
//! zero must do so before calling into this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest qualification the student has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "qualification")]
pub enum Qualification {
    #[default]
    #[serde(rename = "12th")]
    #[sqlx(rename = "12th")]
    Twelfth,
    #[serde(rename = "Graduation")]
    #[sqlx(rename = "Graduation")]
    Graduation,
}

impl Qualification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualification::Twelfth => "12th",
            Qualification::Graduation => "Graduation",
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qualification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "12th" => Ok(Qualification::Twelfth),
            "graduation" => Ok(Qualification::Graduation),
            other => Err(format!(
                "Unknown qualification '{}' (expected '12th' or 'Graduation')",
                other
            )),
        }
    }
}

/// Lead temperature derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_quality")]
pub enum LeadQuality {
    Hot,
    Warm,
    Cold,
}

impl LeadQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadQuality::Hot => "Hot",
            LeadQuality::Warm => "Warm",
            LeadQuality::Cold => "Cold",
        }
    }

    /// Decorative marker used in human-readable summaries.
    pub fn glyph(&self) -> &'static str {
        match self {
            LeadQuality::Hot => "🔥",
            LeadQuality::Warm => "🟡",
            LeadQuality::Cold => "🔵",
        }
    }
}

impl fmt::Display for LeadQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(LeadQuality::Hot),
            "warm" => Ok(LeadQuality::Warm),
            "cold" => Ok(LeadQuality::Cold),
            other => Err(format!("Unknown lead quality '{}'", other)),
        }
    }
}

/// Study destination recommended from the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "destination")]
pub enum Destination {
    #[serde(rename = "Australia")]
    #[sqlx(rename = "Australia")]
    Australia,
    #[serde(rename = "United Kingdom")]
    #[sqlx(rename = "United Kingdom")]
    UnitedKingdom,
    #[serde(rename = "Dubai/UAE")]
    #[sqlx(rename = "Dubai/UAE")]
    DubaiUae,
    #[serde(rename = "Singapore")]
    #[sqlx(rename = "Singapore")]
    Singapore,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Australia => "Australia",
            Destination::UnitedKingdom => "United Kingdom",
            Destination::DubaiUae => "Dubai/UAE",
            Destination::Singapore => "Singapore",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Destination::Australia => "🇦🇺",
            Destination::UnitedKingdom => "🇬🇧",
            Destination::DubaiUae => "🇦🇪",
            Destination::Singapore => "🇸🇬",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "australia" => Ok(Destination::Australia),
            "united kingdom" | "uk" => Ok(Destination::UnitedKingdom),
            "dubai/uae" | "dubai" | "uae" => Ok(Destination::DubaiUae),
            "singapore" => Ok(Destination::Singapore),
            other => Err(format!("Unknown destination '{}'", other)),
        }
    }
}

/// The scoring-relevant subset of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoringInput {
    /// IELTS band, if provided.
    pub ielts_score: Option<f64>,
    /// Budget in lakhs, if provided.
    pub budget: Option<i64>,
    pub qualification: Qualification,
    pub backlogs: bool,
}

/// Derived fields written alongside every lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub lead_score: i32,
    pub recommended_country: Destination,
    pub lead_quality: LeadQuality,
}

fn ielts_points(ielts_score: Option<f64>) -> i32 {
    match ielts_score {
        Some(band) if band != 0.0 => {
            if band >= 7.0 {
                30
            } else if band >= 6.0 {
                20
            } else if band >= 5.5 {
                10
            } else {
                5
            }
        }
        _ => 0,
    }
}

fn budget_points(budget: Option<i64>) -> i32 {
    match budget {
        Some(lakhs) if lakhs != 0 => {
            if lakhs >= 30 {
                30
            } else if lakhs >= 25 {
                25
            } else if lakhs >= 20 {
                15
            } else if lakhs >= 15 {
                10
            } else {
                5
            }
        }
        _ => 0,
    }
}

/// Sums the IELTS, budget, qualification and backlog contributions.
///
/// The result is not clamped; a lead with backlogs and nothing else scores 0,
/// a perfect profile scores 100.
pub fn compute_score(
    ielts_score: Option<f64>,
    budget: Option<i64>,
    qualification: Qualification,
    backlogs: bool,
) -> i32 {
    let qualification_points = match qualification {
        Qualification::Graduation => 20,
        Qualification::Twelfth => 10,
    };
    let backlog_points = if backlogs { -10 } else { 20 };

    ielts_points(ielts_score) + budget_points(budget) + qualification_points + backlog_points
}

/// Picks a destination from the budget (in lakhs) alone.
pub fn recommend_country(budget: Option<i64>) -> Destination {
    match budget {
        Some(lakhs) if lakhs >= 30 => Destination::Australia,
        Some(lakhs) if lakhs >= 25 => Destination::UnitedKingdom,
        Some(lakhs) if lakhs >= 15 => Destination::DubaiUae,
        _ => Destination::Singapore,
    }
}

pub fn classify_quality(lead_score: i32) -> LeadQuality {
    if lead_score >= 85 {
        LeadQuality::Hot
    } else if lead_score >= 65 {
        LeadQuality::Warm
    } else {
        LeadQuality::Cold
    }
}

/// Recomputes every derived field from the current inputs.
///
/// Every write path that can change a scoring input must call this before
/// persisting.
pub fn assess(input: &ScoringInput) -> Assessment {
    let lead_score = compute_score(
        input.ielts_score,
        input.budget,
        input.qualification,
        input.backlogs,
    );
    let recommended_country = recommend_country(input.budget);
    let lead_quality = classify_quality(lead_score);

    Assessment {
        lead_score,
        recommended_country,
        lead_quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ielts_bands() {
        assert_eq!(ielts_points(Some(7.0)), 30);
        assert_eq!(ielts_points(Some(8.5)), 30);
        assert_eq!(ielts_points(Some(6.999)), 20);
        assert_eq!(ielts_points(Some(6.0)), 20);
        assert_eq!(ielts_points(Some(5.999)), 10);
        assert_eq!(ielts_points(Some(5.5)), 10);
        assert_eq!(ielts_points(Some(5.499)), 5);
        assert_eq!(ielts_points(None), 0);
    }

    #[test]
    fn test_budget_bands() {
        assert_eq!(budget_points(Some(30)), 30);
        assert_eq!(budget_points(Some(29)), 25);
        assert_eq!(budget_points(Some(25)), 25);
        assert_eq!(budget_points(Some(24)), 15);
        assert_eq!(budget_points(Some(20)), 15);
        assert_eq!(budget_points(Some(19)), 10);
        assert_eq!(budget_points(Some(15)), 10);
        assert_eq!(budget_points(Some(14)), 5);
        assert_eq!(budget_points(None), 0);
    }

    #[test]
    fn test_negative_inputs_count_as_present() {
        assert_eq!(ielts_points(Some(-1.0)), 5);
        assert_eq!(budget_points(Some(-3)), 5);
        assert_eq!(recommend_country(Some(-3)), Destination::Singapore);
    }

    #[test]
    fn test_assess_orders_country_and_quality_from_fresh_score() {
        let input = ScoringInput {
            ielts_score: Some(7.5),
            budget: Some(32),
            qualification: Qualification::Graduation,
            backlogs: false,
        };
        let assessment = assess(&input);
        assert_eq!(assessment.lead_score, 100);
        assert_eq!(assessment.recommended_country, Destination::Australia);
        assert_eq!(assessment.lead_quality, LeadQuality::Hot);
    }

    #[test]
    fn test_qualification_parsing() {
        assert_eq!("12th".parse::<Qualification>(), Ok(Qualification::Twelfth));
        assert_eq!(
            " graduation ".parse::<Qualification>(),
            Ok(Qualification::Graduation)
        );
        assert!("PhD".parse::<Qualification>().is_err());
    }

    #[test]
    fn test_destination_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Destination::DubaiUae).unwrap();
        assert_eq!(json, "\"Dubai/UAE\"");
        let back: Destination = serde_json::from_str("\"United Kingdom\"").unwrap();
        assert_eq!(back, Destination::UnitedKingdom);
    }
}
