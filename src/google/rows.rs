use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::model::{ContactSubmission, EstimateSummary, LeadSubmission};

// Sheet consumers depend on column order: new columns go at the end.
pub const LEAD_HEADER: [&str; 10] = [
    "Timestamp",
    "Name",
    "Email",
    "Phone",
    "Address",
    "Estimated Value",
    "Low",
    "High",
    "Confidence",
    "Source",
];

pub const CONTACT_HEADER: [&str; 8] = [
    "Timestamp",
    "Name",
    "Email",
    "Phone",
    "Message",
    "Preferred Contact",
    "Interested In",
    "Property Address",
];

pub fn lead_row(lead: &LeadSubmission, at: DateTime<Utc>) -> Vec<Value> {
    let address = lead
        .property_data
        .as_ref()
        .map(|p| p.composed_address())
        .unwrap_or_default();
    let estimate = lead
        .estimate_data
        .as_ref()
        .map(EstimateSummary::from_json)
        .unwrap_or_default();

    vec![
        json!(timestamp(at)),
        json!(lead.name),
        json!(lead.email),
        json!(lead.phone),
        json!(address),
        json!(estimate.value),
        json!(estimate.low),
        json!(estimate.high),
        json!(estimate.confidence),
        json!(estimate.source),
    ]
}

pub fn contact_row(contact: &ContactSubmission, at: DateTime<Utc>) -> Vec<Value> {
    let text = |v: &Option<String>| json!(v.as_deref().unwrap_or_default());

    vec![
        json!(timestamp(at)),
        json!(contact.name),
        json!(contact.email),
        json!(contact.phone),
        json!(contact.message),
        text(&contact.preferred_contact),
        text(&contact.interested_in),
        text(&contact.property_address),
    ]
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn extract_spreadsheet_id(input: &str) -> String {
    let trimmed = input.trim();
    if let Some((_, rest)) = trimmed.split_once("/spreadsheets/d/") {
        let id: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !id.is_empty() {
            return id;
        }
    }
    trimmed.to_string()
}

pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Sheet title named by an A1 range, if any. `'Leads'!A1` and a bare
/// `Leads` both name the tab; `A1:J1` does not.
pub fn sheet_title_of_range(range: &str) -> Option<String> {
    let range = range.trim();
    let sheet = match range.rsplit_once('!') {
        Some((sheet, _)) => sheet.trim(),
        None if is_cell_reference(range) => return None,
        None => range,
    };
    let unquoted = sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_string());
    Some(unquoted).filter(|s| !s.is_empty())
}

// A1, A:J, 1:2, A1:J1
fn is_cell_reference(s: &str) -> bool {
    let mut parts = s.split(':');
    let all_refs = parts.by_ref().take(2).all(|part| {
        let letters = part.chars().take_while(char::is_ascii_alphabetic).count();
        !part.is_empty() && letters <= 3 && part[letters..].chars().all(|c| c.is_ascii_digit())
    });
    all_refs && parts.next().is_none()
}

pub fn column_letter(n: usize) -> char {
    (b'A' + (n.clamp(1, 26) - 1) as u8) as char
}
