//! Read-only views over stored leads: analytics series and CSV export.

use std::borrow::Cow;

use crate::errors::AppError;
use crate::models::{AnalyticsReport, DashboardStats, Lead};
use crate::storage::MonthlyCount;

pub const CSV_HEADER: [&str; 6] = ["Name", "Phone", "Score", "Quality", "Country", "Status"];

/// Turns per-month rows into chart series labelled like `Mar 2026`.
pub fn build_analytics(months: &[MonthlyCount], stats: &DashboardStats) -> AnalyticsReport {
    let mut report = AnalyticsReport {
        hot: stats.hot,
        warm: stats.warm,
        cold: stats.cold,
        ..Default::default()
    };

    for row in months {
        report.labels.push(row.month.format("%b %Y").to_string());
        report.lead_data.push(row.total);
        report.converted_data.push(row.converted);
    }

    report
}

/// Neutralizes cells a spreadsheet would evaluate as a formula.
///
/// E.164 phone numbers (`+` then digits only) are left alone.
fn sanitize_cell(value: &str) -> Cow<'_, str> {
    let is_e164 = value
        .strip_prefix('+')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
    if !is_e164 && value.starts_with(['=', '+', '-', '@']) {
        Cow::Owned(format!("'{}", value))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders the lead export with CRLF line endings.
pub fn leads_to_csv(leads: &[Lead]) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for lead in leads {
        let score = lead.lead_score.to_string();
        writer
            .write_record([
                &*sanitize_cell(&lead.name),
                &*sanitize_cell(&lead.phone),
                score.as_str(),
                lead.lead_quality.as_str(),
                lead.recommended_country.as_str(),
                lead.crm_status.as_str(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::InternalError(format!("CSV is not UTF-8: {}", e)))
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::InternalError(format!("CSV write failed: {}", err))
}
