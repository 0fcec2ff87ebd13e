use chrono::NaiveDateTime;
use std::num::IntErrorKind;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{
    Counsellor, CrmStatus, DashboardStats, Lead, LeadFilter, LeadProfile, NewCounsellor, Page,
};
use crate::scoring;

/// Leads shown per list page.
pub const PAGE_SIZE: i64 = 10;

/// Lead and counsellor persistence.
///
/// Derived scoring fields are written only by methods that take a full
/// [`LeadProfile`] (or re-read the stored inputs), so they can never go stale.
#[derive(Clone)]
pub struct LeadStorage {
    pool: PgPool,
}

/// One calendar month of lead volume.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MonthlyCount {
    /// First instant of the month (UTC).
    pub month: NaiveDateTime,
    pub total: i64,
    pub converted: i64,
}

/// Resolves a requested page number the way a forgiving paginator does.
///
/// Missing or non-integer input gives page 1. Any integer outside
/// `1..=num_pages` (including one too large to represent) gives the last page.
/// An empty result set still has one (empty) page.
pub fn resolve_page(requested: Option<&str>, total: i64, per_page: i64) -> (i64, i64) {
    let num_pages = if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    };
    let Some(raw) = requested.map(str::trim) else {
        return (1, num_pages);
    };
    let page = match raw.parse::<i64>() {
        Ok(p) if (1..=num_pages).contains(&p) => p,
        Ok(_) => num_pages,
        Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            num_pages
        }
        Err(_) => 1,
    };
    (page, num_pages)
}

/// Escapes `LIKE` metacharacters so user input matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &LeadFilter) {
    builder.push(" WHERE TRUE");

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR phone ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND crm_status = ");
        builder.push_bind(status);
    }
    if let Some(quality) = filter.quality {
        builder.push(" AND lead_quality = ");
        builder.push_bind(quality);
    }
    if let Some(country) = filter.country {
        builder.push(" AND recommended_country = ");
        builder.push_bind(country);
    }
}

impl LeadStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Scores and stores a new lead.
    pub async fn insert_lead(&self, profile: &LeadProfile) -> Result<Lead, AppError> {
        let assessment = profile.assessment();
        let id = Uuid::new_v4();

        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                id, name, email, phone, country_interest, course_interest,
                ielts_score, budget, qualification, backlogs, intake,
                lead_score, recommended_country, lead_quality, crm_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.country_interest)
        .bind(&profile.course_interest)
        .bind(profile.ielts_score)
        .bind(profile.budget)
        .bind(profile.qualification)
        .bind(profile.backlogs)
        .bind(&profile.intake)
        .bind(assessment.lead_score)
        .bind(assessment.recommended_country)
        .bind(assessment.lead_quality)
        .bind(CrmStatus::New)
        .fetch_one(&self.pool)
        .await
        .context("inserting lead")?;

        tracing::info!(
            "✓ Lead stored: {} (score {}, {}, {})",
            lead.id,
            lead.lead_score,
            lead.lead_quality,
            lead.recommended_country
        );
        Ok(lead)
    }

    /// Administrative edit of identity and profile fields; always rescores.
    pub async fn update_profile(&self, id: Uuid, profile: &LeadProfile) -> Result<Lead, AppError> {
        let assessment = profile.assessment();

        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET name = $2,
                email = $3,
                phone = $4,
                country_interest = $5,
                course_interest = $6,
                ielts_score = $7,
                budget = $8,
                qualification = $9,
                backlogs = $10,
                intake = $11,
                lead_score = $12,
                recommended_country = $13,
                lead_quality = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.country_interest)
        .bind(&profile.course_interest)
        .bind(profile.ielts_score)
        .bind(profile.budget)
        .bind(profile.qualification)
        .bind(profile.backlogs)
        .bind(&profile.intake)
        .bind(assessment.lead_score)
        .bind(assessment.recommended_country)
        .bind(assessment.lead_quality)
        .fetch_optional(&self.pool)
        .await
        .context("updating lead profile")?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))?;

        tracing::info!("✓ Lead {} updated and rescored: {}", lead.id, lead.lead_score);
        Ok(lead)
    }

    /// Moves a lead through the pipeline and (re)assigns it.
    ///
    /// Touches only workflow columns, which are not scoring inputs.
    pub async fn update_workflow(
        &self,
        id: Uuid,
        status: CrmStatus,
        assigned_to: Option<Uuid>,
    ) -> Result<Lead, AppError> {
        if let Some(counsellor_id) = assigned_to {
            if !self.counsellor_exists(counsellor_id).await? {
                return Err(AppError::BadRequest(format!(
                    "Counsellor {} does not exist",
                    counsellor_id
                )));
            }
        }

        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET crm_status = $2, assigned_to = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(assigned_to)
        .fetch_optional(&self.pool)
        .await
        .context("updating lead workflow")?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))?;

        tracing::info!(
            "Lead {} moved to '{}' (assigned to {:?})",
            lead.id,
            lead.crm_status,
            lead.assigned_to
        );
        Ok(lead)
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Lead, AppError> {
        sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))
    }

    pub async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
        }
        tracing::info!("Lead {} deleted", id);
        Ok(())
    }

    /// Filtered, newest-first page of leads.
    pub async fn list_leads(
        &self,
        filter: &LeadFilter,
        requested_page: Option<&str>,
    ) -> Result<Page<Lead>, AppError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .context("counting leads")?;

        let (page, num_pages) = resolve_page(requested_page, total, PAGE_SIZE);

        let mut list_query = QueryBuilder::<Postgres>::new("SELECT * FROM leads");
        push_filters(&mut list_query, filter);
        list_query.push(" ORDER BY created_at DESC, id LIMIT ");
        list_query.push_bind(PAGE_SIZE);
        list_query.push(" OFFSET ");
        list_query.push_bind((page - 1) * PAGE_SIZE);

        let items = list_query
            .build_query_as::<Lead>()
            .fetch_all(&self.pool)
            .await
            .context("listing leads")?;

        Ok(Page {
            items,
            page,
            num_pages,
            per_page: PAGE_SIZE,
            total,
            has_next: page < num_pages,
            has_previous: page > 1,
        })
    }

    /// Every lead, newest first, for export.
    pub async fn export_rows(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await
            .context("exporting leads")?;
        Ok(leads)
    }

    pub async fn dashboard_counts(&self) -> Result<DashboardStats, AppError> {
        let (total, hot, warm, cold, converted): (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE lead_quality = 'Hot'),
                COUNT(*) FILTER (WHERE lead_quality = 'Warm'),
                COUNT(*) FILTER (WHERE lead_quality = 'Cold'),
                COUNT(*) FILTER (WHERE crm_status = 'converted')
            FROM leads
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("computing dashboard counts")?;

        Ok(DashboardStats {
            total,
            hot,
            warm,
            cold,
            converted,
        })
    }

    /// Lead and conversion volume per UTC calendar month, oldest first.
    pub async fn monthly_counts(&self) -> Result<Vec<MonthlyCount>, AppError> {
        let rows = sqlx::query_as::<_, MonthlyCount>(
            r#"
            SELECT
                date_trunc('month', created_at AT TIME ZONE 'UTC') AS month,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE crm_status = 'converted') AS converted
            FROM leads
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("computing monthly counts")?;
        Ok(rows)
    }

    /// Recomputes derived fields for every stored lead whose values are stale.
    ///
    /// Returns the number of rows rewritten.
    pub async fn rescore_all(&self) -> Result<u64, AppError> {
        let leads = self.export_rows().await?;
        let mut rewritten = 0;

        for lead in leads.iter().filter(|l| !l.is_assessment_current()) {
            let assessment = scoring::assess(&lead.scoring_input());
            sqlx::query(
                r#"
                UPDATE leads
                SET lead_score = $2, recommended_country = $3, lead_quality = $4
                WHERE id = $1
                "#,
            )
            .bind(lead.id)
            .bind(assessment.lead_score)
            .bind(assessment.recommended_country)
            .bind(assessment.lead_quality)
            .execute(&self.pool)
            .await
            .with_context(|| format!("rescoring lead {}", lead.id))?;

            tracing::info!(
                "Rescored lead {}: {} -> {}",
                lead.id,
                lead.lead_score,
                assessment.lead_score
            );
            rewritten += 1;
        }

        Ok(rewritten)
    }

    // ============ Counsellors ============

    pub async fn create_counsellor(&self, new: &NewCounsellor) -> Result<Counsellor, AppError> {
        let username = new.username.trim();
        let full_name = new.full_name.trim();
        if username.is_empty() || full_name.is_empty() {
            return Err(AppError::BadRequest(
                "username and full_name are required".to_string(),
            ));
        }

        let result = sqlx::query_as::<_, Counsellor>(
            r#"
            INSERT INTO counsellors (id, username, full_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(counsellor) => Ok(counsellor),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::BadRequest(format!("Username '{}' is already taken", username)),
            ),
            Err(e) => Err(AppError::DatabaseError(e)),
        }
    }

    pub async fn list_counsellors(&self) -> Result<Vec<Counsellor>, AppError> {
        let counsellors =
            sqlx::query_as::<_, Counsellor>("SELECT * FROM counsellors ORDER BY username")
                .fetch_all(&self.pool)
                .await?;
        Ok(counsellors)
    }

    pub async fn counsellor_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM counsellors WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_page_defaults_and_clamps() {
        assert_eq!(resolve_page(None, 25, 10), (1, 3));
        assert_eq!(resolve_page(Some("2"), 25, 10), (2, 3));
        assert_eq!(resolve_page(Some("99"), 25, 10), (3, 3));
        assert_eq!(resolve_page(Some("abc"), 25, 10), (1, 3));
        assert_eq!(resolve_page(Some("2.5"), 25, 10), (1, 3));
        assert_eq!(resolve_page(Some(""), 25, 10), (1, 3));
    }

    #[test]
    fn test_resolve_page_out_of_range_integers_give_last_page() {
        assert_eq!(resolve_page(Some("0"), 25, 10), (3, 3));
        assert_eq!(resolve_page(Some("-4"), 25, 10), (3, 3));
        assert_eq!(resolve_page(Some("99999999999999999999"), 25, 10), (3, 3));
        assert_eq!(resolve_page(Some("-99999999999999999999"), 25, 10), (3, 3));
    }

    #[test]
    fn test_resolve_page_empty_result_has_one_page() {
        assert_eq!(resolve_page(Some("5"), 0, 10), (1, 1));
        assert_eq!(resolve_page(None, 10, 10), (1, 1));
        assert_eq!(resolve_page(Some("2"), 11, 10), (2, 2));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("priya"), "priya");
    }

    #[test]
    fn test_push_filters_builds_expected_sql() {
        let filter = LeadFilter {
            search: Some("ravi".to_string()),
            status: Some(CrmStatus::Contacted),
            quality: None,
            country: None,
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM leads");
        push_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM leads WHERE TRUE AND (name ILIKE $1 OR phone ILIKE $2 OR email ILIKE $3) AND crm_status = $4"
        );
    }
}
