use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::db::{ContactRecord, LeadRecord, LeadStore};
use crate::google::{AppendOutcome, SheetsClient};
use crate::model::{ContactSubmission, LeadSubmission};

pub struct SubmissionPersister {
    store: Arc<LeadStore>,
    sheets: Arc<SheetsClient>,
}

#[derive(Debug)]
pub struct LeadOutcome {
    pub lead: Option<LeadRecord>,
    pub estimate_id: Option<i64>,
    pub sheets: AppendOutcome,
}

#[derive(Debug)]
pub struct ContactOutcome {
    pub submission: Option<ContactRecord>,
    pub sheets: AppendOutcome,
}

impl SubmissionPersister {
    pub fn new(store: Arc<LeadStore>, sheets: Arc<SheetsClient>) -> Self {
        Self { store, sheets }
    }

    pub async fn persist_lead(&self, lead: &LeadSubmission) -> Result<LeadOutcome> {
        let (record, db_error) = match self.store.insert_lead(lead).await {
            Ok(record) => {
                info!("Lead {} saved to database", record.id);
                (Some(record), None)
            }
            Err(e) => {
                error!("Failed to save lead to database: {:#}", e);
                (None, Some(format!("{:#}", e)))
            }
        };

        let sheets = self.sheets.append_lead(lead).await;
        log_append("lead", &sheets);

        // Only a stored lead can own an estimate row.
        let estimate_id = match (&record, &lead.property_data, &lead.estimate_data) {
            (Some(record), Some(property), Some(estimate)) => {
                match self
                    .store
                    .insert_property_estimate(record.id, property, estimate)
                    .await
                {
                    Ok(id) => {
                        info!("Property estimate {} saved for lead {}", id, record.id);
                        Some(id)
                    }
                    Err(e) => {
                        warn!("Failed to save property estimate for lead {}: {:#}", record.id, e);
                        None
                    }
                }
            }
            _ => None,
        };

        if record.is_none() && !sheets.is_appended() {
            anyhow::bail!(
                "No sink accepted the lead (database: {}; sheets: {})",
                db_error.unwrap_or_default(),
                describe(&sheets)
            );
        }

        Ok(LeadOutcome {
            lead: record,
            estimate_id,
            sheets,
        })
    }

    pub async fn persist_contact(&self, contact: &ContactSubmission) -> Result<ContactOutcome> {
        let (record, db_error) = match self.store.insert_contact(contact).await {
            Ok(record) => {
                info!("Contact submission {} saved to database", record.id);
                (Some(record), None)
            }
            Err(e) => {
                error!("Failed to save contact submission to database: {:#}", e);
                (None, Some(format!("{:#}", e)))
            }
        };

        let sheets = self.sheets.append_contact(contact).await;
        log_append("contact submission", &sheets);

        if record.is_none() && !sheets.is_appended() {
            anyhow::bail!(
                "No sink accepted the contact submission (database: {}; sheets: {})",
                db_error.unwrap_or_default(),
                describe(&sheets)
            );
        }

        Ok(ContactOutcome {
            submission: record,
            sheets,
        })
    }
}

fn log_append(what: &str, outcome: &AppendOutcome) {
    match outcome {
        AppendOutcome::Appended => info!("Google Sheets append succeeded for {}", what),
        AppendOutcome::Skipped(reason) => info!("Google Sheets append skipped for {}: {}", what, reason),
        AppendOutcome::Failed(reason) => warn!("Google Sheets append failed for {}: {}", what, reason),
    }
}

fn describe(outcome: &AppendOutcome) -> String {
    match outcome {
        AppendOutcome::Appended => "appended".to_string(),
        AppendOutcome::Skipped(reason) => format!("skipped, {}", reason),
        AppendOutcome::Failed(reason) => reason.clone(),
    }
}
