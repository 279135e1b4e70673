use diesel::prelude::*;
use serde::Serialize;
use crate::schema::admin_users;
use crate::schema::analytics_events;
use crate::schema::leads;

#[derive(Queryable, Selectable, Serialize, Clone, Debug)]
#[diesel(table_name = leads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Lead {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub source: String, // where the signup came from, "landing" for the public form
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub consent_email: bool,
    pub consent_whatsapp: bool,
    pub consent_terms: bool, // must be true at submission time
    pub status: String, // "pending", "confirmed" or "converted", operators move it forward
    pub created_at: i32,
    pub updated_at: i32,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = leads)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub source: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub consent_email: bool,
    pub consent_whatsapp: bool,
    pub consent_terms: bool,
    pub status: String,
    pub created_at: i32,
    pub updated_at: i32,
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = analytics_events)]
pub struct NewAnalyticsEvent {
    pub event_type: String,
    pub event_data: String, // JSON payload serialized to text
    pub lead_id: Option<i32>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: i32,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = admin_users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AdminUser {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String, // "admin" or "viewer", both grant dashboard access
    pub created_at: i32,
}
