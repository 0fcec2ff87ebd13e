use reqwest::Client;
use std::time::Duration;

use crate::config::NotifierConfig;
use crate::errors::{AppError, ResultExt};
use crate::models::Lead;

/// Twilio rejects WhatsApp bodies longer than this.
const MAX_BODY_CHARS: usize = 1600;

/// Sends counsellor alerts over the Twilio WhatsApp Messages API.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    client: Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

/// Text sent to the counsellor for a new lead.
pub fn notification_text(lead: &Lead, summary: &str) -> String {
    let text = format!(
        "🆕 New lead: {} ({})\nScore {} · {} · {}\n\n{}",
        lead.name,
        lead.phone,
        lead.lead_score,
        lead.lead_quality,
        lead.recommended_country,
        summary
    );

    if text.chars().count() > MAX_BODY_CHARS {
        let truncated: String = text.chars().take(MAX_BODY_CHARS - 1).collect();
        tracing::debug!("Notification truncated to {} chars", MAX_BODY_CHARS);
        format!("{}…", truncated)
    } else {
        text
    }
}

impl WhatsAppNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create Twilio client: {}", e))
            })?;

        Ok(Self {
            client,
            messages_url: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.base_url.trim_end_matches('/'),
                config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }

    /// Sends one WhatsApp message to the configured counsellor.
    pub async fn send(&self, body: &str) -> Result<(), AppError> {
        let from = format!("whatsapp:{}", self.from);
        let to = format!("whatsapp:{}", self.to);
        let form = [("From", from.as_str()), ("To", to.as_str()), ("Body", body)];

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(AppError::from)
            .context("Twilio request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Twilio returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("✓ WhatsApp notification sent to {}", self.to);
        Ok(())
    }

    /// Sends on a background task. Failures are logged and dropped.
    pub fn dispatch(&self, body: String) -> tokio::task::JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&body).await {
                tracing::warn!("⚠️  WhatsApp notification failed: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CrmStatus;
    use crate::scoring::{Destination, LeadQuality, Qualification};
    use chrono::Utc;
    use uuid::Uuid;

    fn lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            name: "Kiran".to_string(),
            email: Some("kiran@example.com".to_string()),
            phone: "+919876543210".to_string(),
            country_interest: String::new(),
            course_interest: "MBA".to_string(),
            ielts_score: Some(7.0),
            budget: Some(26),
            qualification: Qualification::Graduation,
            backlogs: false,
            intake: "September".to_string(),
            lead_score: 95,
            recommended_country: Destination::UnitedKingdom,
            lead_quality: LeadQuality::Hot,
            crm_status: CrmStatus::New,
            assigned_to: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_notification_text_header() {
        let text = notification_text(&lead(), "Profile analyzed.");
        assert!(text.starts_with("🆕 New lead: Kiran (+919876543210)\nScore 95 · Hot · United Kingdom"));
        assert!(text.ends_with("Profile analyzed."));
    }

    #[test]
    fn test_notification_text_is_truncated() {
        let long = "é".repeat(5000);
        let text = notification_text(&lead(), &long);
        assert_eq!(text.chars().count(), MAX_BODY_CHARS);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn test_messages_url_uses_account_sid() {
        let notifier = WhatsAppNotifier::new(&NotifierConfig {
            base_url: "https://api.twilio.com/".to_string(),
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from: "+14155238886".to_string(),
            to: "+917605021990".to_string(),
        })
        .unwrap();
        assert_eq!(
            notifier.messages_url,
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
