use std::future::Future;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

pub const WELCOME_SUBJECT: &str = "¡Bienvenido al Club SHOC! Tu lugar está reservado";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Missing env: {0}")]
    Config(String),
    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Brevo send failed ({status}): {message}")]
    Api { status: u16, message: String },
}

pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub bcc_email: String,
    pub api_url: String,
}

impl BrevoConfig {
    /// All four provider variables must be present before a send is
    /// attempted; anything missing is a configuration error, not a
    /// delivery failure.
    pub fn from_env() -> Result<Self, EmailError> {
        fn require(name: &'static str, missing: &mut Vec<&'static str>) -> String {
            match std::env::var(name) {
                Ok(value) if !value.is_empty() => value,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        }
        let mut missing = Vec::new();
        let api_key = require("BREVO_API_KEY", &mut missing);
        let sender_email = require("BREVO_SENDER_EMAIL", &mut missing);
        let sender_name = require("BREVO_SENDER_NAME", &mut missing);
        let bcc_email = require("BREVO_BCC_EMAIL", &mut missing);
        if !missing.is_empty() {
            return Err(EmailError::Config(missing.join(", ")));
        }
        Ok(Self {
            api_key,
            sender_email,
            sender_name,
            bcc_email,
            api_url: std::env::var("BREVO_API_URL")
                .unwrap_or_else(|_| "https://api.brevo.com".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct WelcomeEmailRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

/// Side of the submission pipeline that hands a new member off to the
/// transactional-email provider. A trait so tests can observe or fail the
/// send without touching the network.
pub trait WelcomeNotifier {
    fn send_welcome(
        &self,
        request: &WelcomeEmailRequest,
    ) -> impl Future<Output = Result<String, EmailError>> + Send;
}

pub struct BrevoClient {
    http: reqwest::Client,
}

impl BrevoClient {
    pub fn new() -> Self {
        // bounded timeout, the welcome email must never stall a submission
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }
}

impl WelcomeNotifier for BrevoClient {
    async fn send_welcome(&self, request: &WelcomeEmailRequest) -> Result<String, EmailError> {
        let config = BrevoConfig::from_env()?;

        let payload = json!({
            "sender": { "name": config.sender_name, "email": config.sender_email },
            "to": [{ "email": request.email, "name": request.name }],
            "bcc": [{ "email": config.bcc_email, "name": "SHOC" }],
            "replyTo": { "email": config.bcc_email, "name": "SHOC" },
            "subject": WELCOME_SUBJECT,
            "htmlContent": build_html(request),
            "textContent": build_text(request),
            "tags": ["club-shoc", "prelaunch"],
        });

        // one attempt only; retries are an operator decision
        let response = self
            .http
            .post(format!("{}/v3/smtp/email", config.api_url))
            .header("accept", "application/json")
            .header("api-key", &config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let data: serde_json::Value =
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text.clone() }));

        if !status.is_success() {
            let message = data
                .get("message")
                .or_else(|| data.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Brevo send failed ({})", status.as_u16()));
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data
            .get("messageId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

fn build_html(request: &WelcomeEmailRequest) -> String {
    let mut html = format!(
        "<h2>¡Hola {}! 👋</h2>\n\
         <p><strong>¡Tu lugar en el Club SHOC está oficialmente reservado!</strong></p>\n\
         <ul>\n\
         <li>Acceso anticipado a colecciones limitadas</li>\n\
         <li>Ediciones exclusivas solo para miembros</li>\n\
         <li>Hub de experiencias digitales SHOC</li>\n\
         </ul>\n",
        request.name
    );
    if let (Some(city), Some(province)) = (&request.city, &request.province) {
        html.push_str(&format!("<p>📍 Registrado desde: {}, {}</p>\n", city, province));
    }
    if let Some(phone) = &request.phone {
        html.push_str(&format!("<p>📞 Tel: {}</p>\n", phone));
    }
    html.push_str("<p style=\"margin-top:16px;\">SHOC — Siempre Hay Otro Camino</p>");
    html
}

fn build_text(request: &WelcomeEmailRequest) -> String {
    let mut text = format!(
        "Hola {}!\n\n\
         Tu lugar en el Club SHOC está reservado.\n\n\
         • Acceso anticipado a colecciones limitadas\n\
         • Ediciones exclusivas solo para miembros\n\
         • Hub de experiencias digitales SHOC\n",
        request.name
    );
    if let (Some(city), Some(province)) = (&request.city, &request.province) {
        text.push_str(&format!("\nUbicación: {}, {}", city, province));
    }
    if let Some(phone) = &request.phone {
        text.push_str(&format!("\nTel: {}", phone));
    }
    text.push_str("\n\nSHOC — Siempre Hay Otro Camino");
    text
}
