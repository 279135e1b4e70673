use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::lead_models::Lead;

#[derive(Serialize, Debug, PartialEq)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct CityCount {
    pub city: String,
    pub count: usize,
}

#[derive(Serialize, Debug)]
pub struct LeadStats {
    pub total_leads: usize,
    pub leads_today: usize,
    pub leads_this_week: usize,
    pub conversion_rate: f64,
    pub top_sources: Vec<SourceCount>,
    pub top_cities: Vec<CityCount>,
}

fn attribution_source(lead: &Lead) -> String {
    lead.utm_source
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            if lead.source.is_empty() {
                "Direct".to_string()
            } else {
                lead.source.clone()
            }
        })
}

/// Ranks keys by descending count. The sort is stable, so keys seen earlier
/// in the input win ties.
fn top_counts(keys: impl Iterator<Item = String>, limit: usize) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in keys {
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|key| {
            let count = counts[&key];
            (key, count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

pub fn compute_stats(leads: &[Lead], now: DateTime<Tz>) -> LeadStats {
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(now.timezone()).earliest())
        .map_or_else(|| now.timestamp(), |dt| dt.timestamp());
    let week_start = (now.with_timezone(&Utc) - Duration::days(7)).timestamp();

    let total_leads = leads.len();
    let leads_today = leads
        .iter()
        .filter(|lead| i64::from(lead.created_at) >= today_start)
        .count();
    let leads_this_week = leads
        .iter()
        .filter(|lead| i64::from(lead.created_at) >= week_start)
        .count();

    let conversions = leads.iter().filter(|lead| lead.consent_email).count();
    let conversion_rate = if total_leads > 0 {
        (conversions as f64 / total_leads as f64) * 100.0
    } else {
        0.0
    };

    let top_sources = top_counts(leads.iter().map(attribution_source), 5)
        .into_iter()
        .map(|(source, count)| SourceCount { source, count })
        .collect();

    let top_cities = top_counts(
        leads.iter().filter_map(|lead| {
            let city = lead.city.as_ref()?;
            Some(match &lead.province {
                Some(province) => format!("{}, {}", city, province),
                None => city.clone(),
            })
        }),
        5,
    )
    .into_iter()
    .map(|(city, count)| CityCount { city, count })
    .collect();

    LeadStats {
        total_leads,
        leads_today,
        leads_this_week,
        conversion_rate,
        top_sources,
        top_cities,
    }
}

/// Search matches name, email or city case-insensitively; a status of
/// "all" (or none) passes everything.
pub fn filter_leads(leads: &[Lead], search: Option<&str>, status: Option<&str>) -> Vec<Lead> {
    let term = search.map(|s| s.to_lowercase());
    leads
        .iter()
        .filter(|lead| {
            let matches_search = match &term {
                None => true,
                Some(term) => {
                    lead.name.to_lowercase().contains(term)
                        || lead.email.to_lowercase().contains(term)
                        || lead
                            .city
                            .as_ref()
                            .map_or(false, |city| city.to_lowercase().contains(term))
                }
            };
            let matches_status = match status {
                None | Some("all") => true,
                Some(wanted) => lead.status == wanted,
            };
            matches_search && matches_status
        })
        .cloned()
        .collect()
}

pub const EXPORT_HEADERS: [&str; 10] = [
    "Fecha",
    "Nombre",
    "Email",
    "Teléfono",
    "Ciudad",
    "Provincia",
    "Origen",
    "Estado",
    "Email Consent",
    "WhatsApp Consent",
];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn consent_label(given: bool) -> &'static str {
    if given {
        "Sí"
    } else {
        "No"
    }
}

pub fn export_csv(leads: &[Lead], tz: Tz) -> String {
    let header_row = EXPORT_HEADERS
        .iter()
        .map(|h| quote(h))
        .collect::<Vec<_>>()
        .join(",");
    let mut rows = vec![header_row];
    for lead in leads {
        let date = DateTime::from_timestamp(i64::from(lead.created_at), 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&tz)
            .format("%d/%m/%Y")
            .to_string();
        let fields = [
            date,
            lead.name.clone(),
            lead.email.clone(),
            lead.phone.clone().unwrap_or_default(),
            lead.city.clone().unwrap_or_default(),
            lead.province.clone().unwrap_or_default(),
            attribution_source(lead),
            lead.status.clone(),
            consent_label(lead.consent_email).to_string(),
            consent_label(lead.consent_whatsapp).to_string(),
        ];
        rows.push(
            fields
                .iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Argentina::Buenos_Aires;

    fn lead(name: &str, consent_email: bool) -> Lead {
        Lead {
            id: 1,
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            phone: None,
            city: None,
            province: None,
            source: "landing".to_string(),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            consent_email,
            consent_whatsapp: false,
            consent_terms: true,
            status: "pending".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn conversion_rate_counts_email_consent() {
        let leads = vec![
            lead("a", true),
            lead("b", true),
            lead("c", false),
            lead("d", false),
        ];
        let now = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let stats = compute_stats(&leads, now);
        assert_eq!(stats.total_leads, 4);
        assert_eq!(stats.conversion_rate, 50.0);
    }

    #[test]
    fn empty_set_has_zero_conversion_rate() {
        let now = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let stats = compute_stats(&[], now);
        assert_eq!(stats.total_leads, 0);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[test]
    fn today_and_week_windows_use_local_midnight() {
        let now = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let midnight = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 0, 0, 0).unwrap();
        let mut today = lead("today", false);
        today.created_at = midnight.timestamp() as i32;
        let mut yesterday = lead("yesterday", false);
        yesterday.created_at = (midnight.timestamp() - 3_600) as i32;
        let mut last_month = lead("old", false);
        last_month.created_at = (now.timestamp() - 30 * 86_400) as i32;

        let stats = compute_stats(&[today, yesterday, last_month], now);
        assert_eq!(stats.leads_today, 1);
        assert_eq!(stats.leads_this_week, 2);
    }

    #[test]
    fn top_sources_fall_back_from_utm_to_source() {
        let mut instagram = lead("a", false);
        instagram.utm_source = Some("instagram".to_string());
        let mut instagram2 = lead("b", false);
        instagram2.utm_source = Some("instagram".to_string());
        let landing = lead("c", false);
        let mut direct = lead("d", false);
        direct.source = String::new();

        let now = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let stats = compute_stats(&[instagram, instagram2, landing, direct], now);
        assert_eq!(stats.top_sources[0].source, "instagram");
        assert_eq!(stats.top_sources[0].count, 2);
        let labels: Vec<&str> = stats
            .top_sources
            .iter()
            .map(|s| s.source.as_str())
            .collect();
        assert_eq!(labels, vec!["instagram", "landing", "Direct"]);
    }

    #[test]
    fn top_cities_skip_leads_without_city() {
        let mut salta = lead("a", false);
        salta.city = Some("Salta".to_string());
        salta.province = Some("Salta".to_string());
        let mut salta2 = lead("b", false);
        salta2.city = Some("Salta".to_string());
        salta2.province = Some("Salta".to_string());
        let nowhere = lead("c", false);

        let now = Buenos_Aires.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let stats = compute_stats(&[salta, salta2, nowhere], now);
        assert_eq!(
            stats.top_cities,
            vec![CityCount {
                city: "Salta, Salta".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn search_matches_name_email_or_city() {
        let mut ana = lead("Ana Pérez", false);
        ana.city = Some("Salta".to_string());
        let bruno = lead("Bruno", false);
        let leads = vec![ana, bruno];

        assert_eq!(filter_leads(&leads, Some("ana"), None).len(), 1);
        assert_eq!(filter_leads(&leads, Some("SALTA"), None).len(), 1);
        assert_eq!(filter_leads(&leads, Some("bruno@x.com"), None).len(), 1);
        assert_eq!(filter_leads(&leads, Some("zzz"), None).len(), 0);
        assert_eq!(filter_leads(&leads, None, None).len(), 2);
    }

    #[test]
    fn status_filter_is_exact_or_all() {
        let mut confirmed = lead("a", false);
        confirmed.status = "confirmed".to_string();
        let pending = lead("b", false);
        let leads = vec![confirmed, pending];

        assert_eq!(filter_leads(&leads, None, Some("confirmed")).len(), 1);
        assert_eq!(filter_leads(&leads, None, Some("all")).len(), 2);
        assert_eq!(filter_leads(&leads, None, Some("converted")).len(), 0);
    }

    #[test]
    fn export_quotes_every_field_in_header_order() {
        let mut ana = lead("Ana Pérez", true);
        ana.email = "ana@x.com".to_string();
        ana.city = Some("Salta".to_string());
        ana.created_at = Buenos_Aires
            .with_ymd_and_hms(2025, 9, 10, 12, 0, 0)
            .unwrap()
            .timestamp() as i32;

        let csv = export_csv(&[ana], Buenos_Aires);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Fecha\",\"Nombre\",\"Email\",\"Teléfono\",\"Ciudad\",\"Provincia\",\"Origen\",\"Estado\",\"Email Consent\",\"WhatsApp Consent\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"10/09/2025\",\"Ana Pérez\",\"ana@x.com\",\"\",\"Salta\",\"\",\"landing\",\"pending\",\"Sí\",\"No\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn export_doubles_embedded_quotes() {
        let mut tricky = lead("Ana \"La Jefa\" Pérez", false);
        tricky.created_at = 0;
        let csv = export_csv(&[tricky], Buenos_Aires);
        assert!(csv.contains("\"Ana \"\"La Jefa\"\" Pérez\""));
    }
}
