use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::model::{ContactSubmission, EstimateSummary, LeadSubmission, PropertyDescription};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS leads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS property_estimates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lead_id INTEGER NOT NULL REFERENCES leads(id),
        street_number TEXT,
        street_name TEXT,
        city TEXT,
        postal_code TEXT,
        property_type TEXT,
        property_style TEXT,
        square_footage TEXT,
        year_built INTEGER,
        num_bedrooms INTEGER,
        num_bathrooms INTEGER,
        num_parking_spaces INTEGER,
        basement_type TEXT,
        basement_finished TEXT,
        basement_bedrooms INTEGER,
        annual_taxes REAL,
        estimate_data TEXT NOT NULL,
        estimated_value REAL,
        estimated_value_low REAL,
        estimated_value_high REAL,
        confidence_score REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS contact_submissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        message TEXT NOT NULL,
        preferred_contact TEXT,
        interested_in TEXT,
        property_address TEXT,
        created_at TEXT NOT NULL
    )",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub preferred_contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The pool is opened on first use, once, so the site still serves estimates
/// while the database is down; a failed open is retried on the next write.
pub struct LeadStore {
    url: String,
    max_connections: u32,
    pool: OnceCell<SqlitePool>,
}

impl LeadStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections.max(1),
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .context("Failed to parse database URL")?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if let Some(dir) = options.get_filename().parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("Failed to create table")?;
        }

        info!("Database ready");
        Ok(pool)
    }

    pub async fn insert_lead(&self, lead: &LeadSubmission) -> Result<LeadRecord> {
        let pool = self.pool().await?;
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO leads (name, email, phone, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(created_at)
        .execute(pool)
        .await
        .context("Failed to save lead")?;

        Ok(LeadRecord {
            id: result.last_insert_rowid(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            created_at,
        })
    }

    pub async fn insert_property_estimate(
        &self,
        lead_id: i64,
        property: &PropertyDescription,
        estimate: &Value,
    ) -> Result<i64> {
        let pool = self.pool().await?;
        let summary = EstimateSummary::from_json(estimate);
        let estimate_json =
            serde_json::to_string(estimate).context("Failed to serialize estimate")?;
        let a = &property.address;
        let d = &property.details;

        let result = sqlx::query(
            "INSERT INTO property_estimates (
                lead_id, street_number, street_name, city, postal_code,
                property_type, property_style, square_footage, year_built,
                num_bedrooms, num_bathrooms, num_parking_spaces,
                basement_type, basement_finished, basement_bedrooms, annual_taxes,
                estimate_data, estimated_value, estimated_value_low, estimated_value_high,
                confidence_score, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(lead_id)
        .bind(&a.street_number)
        .bind(&a.street_name)
        .bind(&a.city)
        .bind(&a.zip)
        .bind(&d.property_type)
        .bind(&d.style)
        .bind(&d.sqft)
        .bind(d.year_built.map(i64::from))
        .bind(i64::from(d.num_bedrooms))
        .bind(i64::from(d.num_bathrooms))
        .bind(i64::from(d.num_parking_spaces))
        .bind(&d.basement1)
        .bind(&d.basement_finished)
        .bind(i64::from(d.basement_bedrooms))
        .bind(property.taxes.annual_amount)
        .bind(estimate_json)
        .bind(summary.value)
        .bind(summary.low)
        .bind(summary.high)
        .bind(summary.confidence)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to save property estimate")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_contact(&self, contact: &ContactSubmission) -> Result<ContactRecord> {
        let pool = self.pool().await?;
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO contact_submissions
                (name, email, phone, message, preferred_contact, interested_in, property_address, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.message)
        .bind(&contact.preferred_contact)
        .bind(&contact.interested_in)
        .bind(&contact.property_address)
        .bind(created_at)
        .execute(pool)
        .await
        .context("Failed to save contact submission")?;

        Ok(ContactRecord {
            id: result.last_insert_rowid(),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            message: contact.message.clone(),
            preferred_contact: contact.preferred_contact.clone(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(dir: &tempfile::TempDir) -> LeadStore {
        LeadStore::new(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("nested/leads.db").display()),
            max_connections: 1,
        })
    }

    #[tokio::test]
    async fn lead_and_estimate_rows_are_linked() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let lead: LeadSubmission = serde_json::from_value(json!({
            "name": "Ada", "email": "ada@example.com", "phone": "555",
            "propertyData": { "address": { "streetNumber": "1", "streetName": "Elm", "city": "Guelph", "zip": "N1H" } },
            "estimateData": { "estimate": { "value": 700000, "low": 1, "high": 2 }, "confidence": 0.6, "source": "repliers" },
        }))
        .unwrap();

        let record = store.insert_lead(&lead).await.unwrap();
        assert_eq!(record.name, "Ada");

        let estimate_id = store
            .insert_property_estimate(
                record.id,
                lead.property_data.as_ref().unwrap(),
                lead.estimate_data.as_ref().unwrap(),
            )
            .await
            .unwrap();

        let pool = store.pool().await.unwrap();
        let (lead_id, value, city): (i64, f64, String) = sqlx::query_as(
            "SELECT lead_id, estimated_value, city FROM property_estimates WHERE id = ?",
        )
        .bind(estimate_id)
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(lead_id, record.id);
        assert_eq!(value, 700000.0);
        assert_eq!(city, "Guelph");
    }

    #[tokio::test]
    async fn contact_rows_keep_optional_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let contact: ContactSubmission = serde_json::from_value(json!({
            "name": "Bo", "email": "bo@example.com", "phone": "1", "message": "hello",
            "interestedIn": "selling",
        }))
        .unwrap();

        let record = store.insert_contact(&contact).await.unwrap();
        let pool = store.pool().await.unwrap();
        let (interested_in, preferred): (Option<String>, Option<String>) = sqlx::query_as(
            "SELECT interested_in, preferred_contact FROM contact_submissions WHERE id = ?",
        )
        .bind(record.id)
        .fetch_one(pool)
        .await
        .unwrap();
        assert_eq!(interested_in.as_deref(), Some("selling"));
        assert_eq!(preferred, None);
    }

    #[tokio::test]
    async fn unreachable_database_is_an_error_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = LeadStore::new(&DatabaseConfig {
            url: format!("sqlite://{}", blocker.join("leads.db").display()),
            max_connections: 1,
        });
        let lead: LeadSubmission = serde_json::from_value(json!({ "name": "A" })).unwrap();

        assert!(store.insert_lead(&lead).await.is_err());
        assert!(store.insert_lead(&lead).await.is_err());
    }
}
