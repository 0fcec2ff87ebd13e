use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::intake::LeadSubmission;
use crate::llm::OllamaClient;
use crate::models::*;
use crate::notify::{notification_text, WhatsAppNotifier};
use crate::reporting;
use crate::storage::LeadStorage;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: LeadStorage,
    pub config: Config,
    /// Generative-text client for intake summaries.
    pub llm: OllamaClient,
    /// Counsellor notifications; `None` when not configured.
    pub notifier: Option<WhatsAppNotifier>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "study-abroad-crm",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

// ============ Staff authentication ============

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Checks `Authorization: Bearer <STAFF_API_TOKEN>`.
pub fn validate_staff_token(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !constant_time_compare(token, &config.staff_api_token) {
        return Err(AppError::Unauthorized("Invalid staff token".to_string()));
    }
    Ok(())
}

/// Middleware guarding every staff route.
pub async fn require_staff(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    validate_staff_token(&state.config, request.headers())?;
    Ok(next.run(request).await)
}

// ============ Public intake funnel ============

pub async fn landing() -> Redirect {
    Redirect::to("/chat")
}

/// Minimal chat-style intake form.
pub async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// POST /api/v1/intake
///
/// Stores the lead, asks the model for a profile summary (falling back to a
/// template), and alerts the counsellor in the background.
pub async fn intake(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<LeadSubmission>,
) -> Result<Json<IntakeResponse>, AppError> {
    let Some(user_summary) = submission.summary() else {
        return Err(AppError::BadRequest("Missing required fields.".to_string()));
    };
    let profile = submission.into_profile(&state.config.default_phone_region)?;
    
    let lead = state.storage.insert_lead(&profile).await?;
    tracing::info!("POST /intake - stored lead {}", lead.id);

    let ai_reply = state.llm.summarize(&lead, &user_summary).await;

    if let Some(notifier) = &state.notifier {
        notifier.dispatch(notification_text(&lead, &ai_reply));
    }

    Ok(Json(IntakeResponse {
        success: true,
        lead_id: lead.id,
        ai_reply,
        score: lead.lead_score,
        recommended_country: lead.recommended_country,
        lead_quality: lead.lead_quality,
    }))
}

// ============ Staff: leads ============

/// POST /api/v1/leads
///
/// Administrative entry: no AI summary or notification.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<LeadSubmission>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    let profile = submission.into_profile(&state.config.default_phone_region)?;
    let lead = state.storage.insert_lead(&profile).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// GET /api/v1/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<Page<Lead>>, AppError> {
    let filter = params.to_filter().map_err(AppError::BadRequest)?;
    tracing::debug!("GET /leads - filter: {:?}, page: {:?}", filter, params.page);

    let page = state
        .storage
        .list_leads(&filter, params.page.as_deref())
        .await?;
    Ok(Json(page))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, AppError> {
    Ok(Json(state.storage.get_lead(id).await?))
}

/// PUT /api/v1/leads/:id
///
/// Replaces profile fields and rescores.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(submission): Json<LeadSubmission>,
) -> Result<Json<Lead>, AppError> {
    let profile = submission.into_profile(&state.config.default_phone_region)?;
    Ok(Json(state.storage.update_profile(id, &profile).await?))
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.storage.delete_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/leads/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<WorkflowUpdate>,
) -> Result<Json<Lead>, AppError> {
    let status: CrmStatus = update.status.parse().map_err(AppError::BadRequest)?;
    let lead = state
        .storage
        .update_workflow(id, status, update.assigned_to)
        .await?;
    Ok(Json(lead))
}

/// GET /api/v1/leads/export
pub async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let leads = state.storage.export_rows().await?;
    tracing::info!("Exporting {} leads to CSV", leads.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leads.csv\"",
            ),
        ],
        reporting::leads_to_csv(&leads)?,
    )
        .into_response())
}

// ============ Staff: reporting ============

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.storage.dashboard_counts().await?))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let months = state.storage.monthly_counts().await?;
    let stats = state.storage.dashboard_counts().await?;
    Ok(Json(reporting::build_analytics(&months, &stats)))
}

// ============ Staff: counsellors ============

pub async fn list_counsellors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Counsellor>>, AppError> {
    Ok(Json(state.storage.list_counsellors().await?))
}

pub async fn create_counsellor(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewCounsellor>,
) -> Result<(StatusCode, Json<Counsellor>), AppError> {
    let counsellor = state.storage.create_counsellor(&new).await?;
    tracing::info!("Counsellor created: {}", counsellor.username);
    Ok((StatusCode::CREATED, Json(counsellor)))
}

const CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Study Abroad Assistant</title>
    <style>
        body { font-family: sans-serif; max-width: 640px; margin: 2rem auto; padding: 0 1rem; }
        label { display: block; margin-top: .75rem; }
        input, select, textarea { width: 100%; padding: .4rem; }
        pre { white-space: pre-wrap; background: #f4f4f4; padding: 1rem; }
    </style>
</head>
<body>
    <h1>Study Abroad Assistant</h1>
    <form id="intake">
        <label>Name <input name="name" required></label>
        <label>Email <input name="email" type="email"></label>
        <label>Phone <input name="phone" required></label>
        <label>Preferred country <input name="country_interest"></label>
        <label>Course <input name="course_interest"></label>
        <label>IELTS score <input name="ielts_score" inputmode="decimal"></label>
        <label>Budget (lakhs) <input name="budget" inputmode="numeric"></label>
        <label>Qualification
            <select name="qualification"><option>12th</option><option>Graduation</option></select>
        </label>
        <label>Any backlogs?
            <select name="backlogs"><option value="no">No</option><option value="yes">Yes</option></select>
        </label>
        <label>Intake <input name="intake" placeholder="September"></label>
        <label>Tell us about yourself <textarea name="user_summary" rows="5" required></textarea></label>
        <button type="submit">Analyze my profile</button>
    </form>
    <pre id="reply"></pre>
    <script>
        document.getElementById("intake").addEventListener("submit", async (event) => {
            event.preventDefault();
            const data = Object.fromEntries(new FormData(event.target).entries());
            const reply = document.getElementById("reply");
            reply.textContent = "Analyzing...";
            const res = await fetch("/api/v1/intake", {
                method: "POST",
                headers: { "Content-Type": "application/json" },
                body: JSON.stringify(data)
            });
            const body = await res.json();
            reply.textContent = body.ai_reply || body.error || "Something went wrong.";
        });
    </script>
</body>
</html>
"#;
