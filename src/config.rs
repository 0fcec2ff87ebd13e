use serde::Deserialize;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:0.5b";
const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Settings for the generative-text service used by the intake funnel.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Credentials and addresses for counsellor WhatsApp notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, E.164 without the `whatsapp:` prefix.
    pub from: String,
    /// Counsellor number, E.164 without the `whatsapp:` prefix.
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Bearer token required on every staff endpoint.
    pub staff_api_token: String,
    /// Region used to normalize phone numbers typed without a country code.
    pub default_phone_region: String,
    pub llm: LlmConfig,
    /// `None` disables notifications.
    pub notifier: Option<NotifierConfig>,
}

fn require_http_url(name: &str, value: String) -> anyhow::Result<String> {
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    url::Url::parse(&value).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    Ok(value)
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Strips an optional `whatsapp:` prefix so the address can be re-prefixed on send.
fn bare_whatsapp_number(value: &str) -> String {
    value
        .trim()
        .strip_prefix("whatsapp:")
        .unwrap_or(value.trim())
        .to_string()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let llm = LlmConfig {
            endpoint: require_http_url(
                "OLLAMA_URL",
                optional_var("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            )?,
            model: optional_var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            timeout_secs: optional_var("OLLAMA_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("OLLAMA_TIMEOUT_SECS must be a whole number of seconds"))?
                .unwrap_or(120),
        };

        let notifier = match (
            optional_var("TWILIO_SID"),
            optional_var("TWILIO_TOKEN"),
            optional_var("TWILIO_WHATSAPP_FROM"),
            optional_var("COUNSELLOR_WHATSAPP"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from), Some(to)) => Some(NotifierConfig {
                base_url: require_http_url(
                    "TWILIO_BASE_URL",
                    optional_var("TWILIO_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_TWILIO_BASE_URL.to_string()),
                )?,
                account_sid,
                auth_token,
                from: bare_whatsapp_number(&from),
                to: bare_whatsapp_number(&to),
            }),
            (None, None, None, None) => None,
            _ => {
                tracing::warn!(
                    "Twilio settings are incomplete (need TWILIO_SID, TWILIO_TOKEN, TWILIO_WHATSAPP_FROM, COUNSELLOR_WHATSAPP); notifications disabled"
                );
                None
            }
        };

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            staff_api_token: std::env::var("STAFF_API_TOKEN")
                .map_err(|_| anyhow::anyhow!("STAFF_API_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().len() < 16 {
                        anyhow::bail!("STAFF_API_TOKEN must be at least 16 characters");
                    }
                    Ok(token.trim().to_string())
                })?,
            default_phone_region: optional_var("DEFAULT_PHONE_REGION")
                .unwrap_or_else(|| "IN".to_string())
                .to_ascii_uppercase(),
            llm,
            notifier,
        };

        // Log without sensitive values
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database host: {}", database_host(&config.database_url));
        tracing::debug!("LLM endpoint: {} (model {})", config.llm.endpoint, config.llm.model);
        tracing::debug!("Server Port: {}", config.port);
        match &config.notifier {
            Some(n) => tracing::info!("WhatsApp notifications enabled (to {})", n.to),
            None => tracing::info!("WhatsApp notifications disabled"),
        }

        Ok(config)
    }
}

/// Host part of a database URL, safe to log (no credentials).
pub fn database_host(database_url: &str) -> String {
    url::Url::parse(database_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<unparseable>".to_string())
}
