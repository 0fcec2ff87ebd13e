/// Scoring engine tests
/// Band boundaries, worked examples, and the zero-vs-absent behaviour
use study_abroad_crm::scoring::{
    assess, classify_quality, compute_score, recommend_country, Destination, LeadQuality,
    Qualification, ScoringInput,
};

/// Score contributed by IELTS alone: 12th (+10) and no backlogs (+20) are constant.
fn ielts_part(ielts: f64) -> i32 {
    compute_score(Some(ielts), None, Qualification::Twelfth, false) - 30
}

fn budget_part(budget: i64) -> i32 {
    compute_score(None, Some(budget), Qualification::Twelfth, false) - 30
}

#[cfg(test)]
mod band_tests {
    use super::*;

    #[test]
    fn test_ielts_boundaries() {
        assert_eq!(ielts_part(7.0), 30);
        assert_eq!(ielts_part(6.999), 20);
        assert_eq!(ielts_part(6.0), 20);
        assert_eq!(ielts_part(5.999), 10);
        assert_eq!(ielts_part(5.5), 10);
        assert_eq!(ielts_part(5.499), 5);
        assert_eq!(ielts_part(9.0), 30);
        assert_eq!(ielts_part(1.0), 5);
    }

    #[test]
    fn test_budget_boundaries() {
        assert_eq!(budget_part(30), 30);
        assert_eq!(budget_part(29), 25);
        assert_eq!(budget_part(25), 25);
        assert_eq!(budget_part(24), 15);
        assert_eq!(budget_part(20), 15);
        assert_eq!(budget_part(19), 10);
        assert_eq!(budget_part(15), 10);
        assert_eq!(budget_part(14), 5);
        assert_eq!(budget_part(1), 5);
        assert_eq!(budget_part(500), 30);
    }

    #[test]
    fn test_qualification_contribution() {
        let graduation = compute_score(None, None, Qualification::Graduation, false);
        let twelfth = compute_score(None, None, Qualification::Twelfth, false);
        assert_eq!(graduation - twelfth, 10);
        assert_eq!(graduation, 40);
    }

    #[test]
    fn test_backlogs_contribution() {
        assert_eq!(compute_score(None, None, Qualification::Twelfth, false), 30);
        assert_eq!(compute_score(None, None, Qualification::Twelfth, true), 0);
    }
}

#[cfg(test)]
mod example_tests {
    use super::*;

    #[test]
    fn test_absent_scores_with_twelfth_and_no_backlogs() {
        assert_eq!(compute_score(None, None, Qualification::Twelfth, false), 30);
    }

    #[test]
    fn test_perfect_profile_is_hot_australia() {
        let assessment = assess(&ScoringInput {
            ielts_score: Some(7.5),
            budget: Some(32),
            qualification: Qualification::Graduation,
            backlogs: false,
        });
        assert_eq!(assessment.lead_score, 100);
        assert_eq!(assessment.lead_quality, LeadQuality::Hot);
        assert_eq!(assessment.recommended_country, Destination::Australia);
    }

    #[test]
    fn test_backlog_profile_is_cold_dubai() {
        let assessment = assess(&ScoringInput {
            ielts_score: Some(6.2),
            budget: Some(22),
            qualification: Qualification::Twelfth,
            backlogs: true,
        });
        assert_eq!(assessment.lead_score, 35);
        assert_eq!(assessment.lead_quality, LeadQuality::Cold);
        assert_eq!(assessment.recommended_country, Destination::DubaiUae);
    }

    #[test]
    fn test_lowest_possible_score_is_zero() {
        assert_eq!(compute_score(None, None, Qualification::Twelfth, true), 0);
    }
}

#[cfg(test)]
mod recommendation_tests {
    use super::*;

    #[test]
    fn test_recommend_country_bands() {
        assert_eq!(recommend_country(None), Destination::Singapore);
        assert_eq!(recommend_country(Some(30)), Destination::Australia);
        assert_eq!(recommend_country(Some(29)), Destination::UnitedKingdom);
        assert_eq!(recommend_country(Some(25)), Destination::UnitedKingdom);
        assert_eq!(recommend_country(Some(24)), Destination::DubaiUae);
        assert_eq!(recommend_country(Some(15)), Destination::DubaiUae);
        assert_eq!(recommend_country(Some(14)), Destination::Singapore);
    }

    #[test]
    fn test_classify_quality_bands() {
        assert_eq!(classify_quality(100), LeadQuality::Hot);
        assert_eq!(classify_quality(85), LeadQuality::Hot);
        assert_eq!(classify_quality(84), LeadQuality::Warm);
        assert_eq!(classify_quality(65), LeadQuality::Warm);
        assert_eq!(classify_quality(64), LeadQuality::Cold);
        assert_eq!(classify_quality(0), LeadQuality::Cold);
        assert_eq!(classify_quality(-10), LeadQuality::Cold);
    }
}

#[cfg(test)]
mod zero_value_tests {
    use super::*;

    // Known ambiguous: a real 0 cannot be told apart from "not provided".
    #[test]
    fn test_known_ambiguous_zero_ielts_scores_like_absent() {
        assert_eq!(
            compute_score(Some(0.0), Some(20), Qualification::Graduation, false),
            compute_score(None, Some(20), Qualification::Graduation, false)
        );
    }

    #[test]
    fn test_known_ambiguous_zero_budget_scores_like_absent() {
        assert_eq!(
            compute_score(Some(6.5), Some(0), Qualification::Twelfth, false),
            compute_score(Some(6.5), None, Qualification::Twelfth, false)
        );
        assert_eq!(recommend_country(Some(0)), recommend_country(None));
    }
}
