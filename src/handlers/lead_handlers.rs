use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::api::brevo::{WelcomeEmailRequest, WelcomeNotifier};
use crate::models::lead_models::{NewAnalyticsEvent, NewLead};
use crate::repositories::lead_repository::LeadStore;
use crate::utils::countdown::Phase;
use crate::AppState;

#[derive(Deserialize, Clone, Debug)]
pub struct LeadFormRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub consent_email: bool,
    pub consent_whatsapp: bool,
    pub consent_terms: bool,
}

/// Campaign attribution forwarded by the landing page from its own query
/// string. Absent parameters are simply absent, never an error.
#[derive(Deserialize, Default, Clone, Debug)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields,
    TermsNotAccepted,
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingFields => "Nombre y email son obligatorios.",
            ValidationError::TermsNotAccepted => {
                "Debes aceptar los términos y condiciones para continuar."
            }
        }
    }
}

#[derive(Debug)]
pub enum SubmissionError {
    Validation(ValidationError),
    Insert(String),
}

#[derive(Debug)]
pub struct SubmissionSuccess {
    pub lead_id: i32,
    pub message: String,
}

fn now_epoch() -> i32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i32
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate(form: &LeadFormRequest) -> Result<(), ValidationError> {
    if form.name.trim().is_empty() || form.email.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if !form.consent_terms {
        return Err(ValidationError::TermsNotAccepted);
    }
    Ok(())
}

/// The submission pipeline: validate, insert the lead, record the
/// analytics event, trigger the welcome email when consented. Only the
/// lead insert can fail the submission; the later steps degrade to log
/// lines because the member is already registered by then.
pub async fn run_submission<S: LeadStore, N: WelcomeNotifier>(
    store: &S,
    notifier: &N,
    form: LeadFormRequest,
    utm: UtmParams,
) -> Result<SubmissionSuccess, SubmissionError> {
    validate(&form).map_err(SubmissionError::Validation)?;

    let name = form.name.trim().to_string();
    let email = form.email.trim().to_string();
    let phone = normalized(form.phone);
    let city = normalized(form.city);
    let province = normalized(form.province);
    let now = now_epoch();

    let new_lead = NewLead {
        name: name.clone(),
        email: email.clone(),
        phone: phone.clone(),
        city: city.clone(),
        province: province.clone(),
        source: "landing".to_string(),
        utm_source: utm.utm_source.clone(),
        utm_medium: utm.utm_medium.clone(),
        utm_campaign: utm.utm_campaign.clone(),
        consent_email: form.consent_email,
        consent_whatsapp: form.consent_whatsapp,
        consent_terms: form.consent_terms,
        status: "pending".to_string(),
        created_at: now,
        updated_at: now,
    };

    let lead_id = store
        .insert_lead(new_lead)
        .map_err(|e| SubmissionError::Insert(e.to_string()))?;

    // analytics must not mask a successful submission
    let event = NewAnalyticsEvent {
        event_type: "form_submit".to_string(),
        event_data: json!({
            "form_type": "club_registration",
            "source": "modal",
            "consent_email": form.consent_email,
            "consent_whatsapp": form.consent_whatsapp,
        })
        .to_string(),
        lead_id: Some(lead_id),
        utm_source: utm.utm_source,
        utm_medium: utm.utm_medium,
        utm_campaign: utm.utm_campaign,
        created_at: now,
    };
    if let Err(e) = store.insert_event(event) {
        tracing::error!("Failed to record form_submit event for lead {}: {}", lead_id, e);
    }

    if form.consent_email {
        let request = WelcomeEmailRequest {
            name: name.clone(),
            email,
            phone,
            city,
            province,
        };
        match notifier.send_welcome(&request).await {
            Ok(message_id) => {
                tracing::info!("Welcome email queued for lead {}: {}", lead_id, message_id);
            }
            Err(e) => {
                // the member is registered either way
                tracing::error!("Failed to send welcome email for lead {}: {}", lead_id, e);
            }
        }
    }

    let message = format!(
        "¡Hola {}! Tu lugar en el Club SHOC está reservado.{}",
        name,
        if form.consent_email {
            " Revisá tu email para más detalles."
        } else {
            ""
        }
    );

    Ok(SubmissionSuccess { lead_id, message })
}

pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Query(utm): Query<UtmParams>,
    Json(form): Json<LeadFormRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<serde_json::Value>)> {
    match run_submission(state.lead_repository.as_ref(), &state.brevo, form, utm).await {
        Ok(success) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "lead_id": success.lead_id,
                "message": success.message,
            })),
        )),
        Err(SubmissionError::Validation(e)) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.user_message()})),
        )),
        Err(SubmissionError::Insert(message)) => {
            tracing::error!("Lead insert failed: {}", message);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": message})),
            ))
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct TrackEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
}

/// Fire-and-forget interaction tracking (page_view, cta_click, ...).
/// Always answers 204: a broken analytics write is an operator problem,
/// never a visitor-facing one.
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    Query(utm): Query<UtmParams>,
    Json(req): Json<TrackEventRequest>,
) -> StatusCode {
    let event_data = if req.event_data.is_null() {
        "{}".to_string()
    } else {
        req.event_data.to_string()
    };
    let event = NewAnalyticsEvent {
        event_type: req.event_type,
        event_data,
        lead_id: None,
        utm_source: utm.utm_source,
        utm_medium: utm.utm_medium,
        utm_campaign: utm.utm_campaign,
        created_at: now_epoch(),
    };
    if let Err(e) = state.lead_repository.insert_event(event) {
        tracing::error!("Failed to record analytics event: {}", e);
    }
    StatusCode::NO_CONTENT
}

pub async fn countdown_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let now = Utc::now();
    let left = state.countdown.time_left(now);
    Json(json!({
        "target": state.countdown.target.to_rfc3339(),
        "days": left.days,
        "hours": left.hours,
        "minutes": left.minutes,
        "seconds": left.seconds,
        "progress_pct": state.countdown.progress_pct(now),
        "finished": state.countdown.phase(now) == Phase::Finished,
    }))
}
