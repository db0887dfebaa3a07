use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::oauth::OAuthClient;
use super::rows::{self, CONTACT_HEADER, LEAD_HEADER};
use crate::config::{GoogleConfig, Secrets};
use crate::model::{ContactSubmission, LeadSubmission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Not configured; the feature is off, not broken.
    Skipped(String),
    /// Attempted and rejected.
    Failed(String),
}

impl AppendOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, AppendOutcome::Appended)
    }
}

// Wire shape: {"ok": true} | {"ok": false, "skipped": true, "error": ".."} | {"ok": false, "error": ".."}
impl Serialize for AppendOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            AppendOutcome::Appended => json!({ "ok": true }),
            AppendOutcome::Skipped(reason) => json!({ "ok": false, "skipped": true, "error": reason }),
            AppendOutcome::Failed(reason) => json!({ "ok": false, "error": reason }),
        };
        value.serialize(serializer)
    }
}

struct SheetTarget {
    title: Option<String>,
    range: String,
}

impl SheetTarget {
    fn from_range(range: &str) -> Self {
        Self {
            title: rows::sheet_title_of_range(range),
            range: range.to_string(),
        }
    }

    fn header_range(&self, columns: usize) -> String {
        let last = rows::column_letter(columns);
        match &self.title {
            Some(title) => format!("{}!A1:{}1", rows::quote_sheet_title(title), last),
            None => format!("A1:{}1", last),
        }
    }
}

#[derive(Deserialize, Default)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize, Default)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct SheetsClient {
    client: Client,
    oauth: Arc<OAuthClient>,
    base_url: String,
    spreadsheet_id: Option<String>,
    leads_range: String,
    contact_range: String,
}

impl SheetsClient {
    pub fn new(
        client: Client,
        oauth: Arc<OAuthClient>,
        config: &GoogleConfig,
        secrets: &Secrets,
    ) -> Self {
        let leads_range = secrets
            .sheets_range
            .clone()
            .unwrap_or_else(|| format!("{}!A1", rows::quote_sheet_title(&config.leads_sheet)));

        Self {
            client,
            oauth,
            base_url: config.sheets_base_url.clone(),
            spreadsheet_id: secrets
                .spreadsheet_id
                .as_deref()
                .map(rows::extract_spreadsheet_id),
            leads_range,
            contact_range: format!("{}!A1", rows::quote_sheet_title(&config.contact_sheet)),
        }
    }

    pub async fn append_lead(&self, lead: &LeadSubmission) -> AppendOutcome {
        let row = rows::lead_row(lead, Utc::now());
        let target = SheetTarget::from_range(&self.leads_range);
        self.append_row(&target, &LEAD_HEADER, row).await
    }

    pub async fn append_contact(&self, contact: &ContactSubmission) -> AppendOutcome {
        let row = rows::contact_row(contact, Utc::now());
        let target = SheetTarget::from_range(&self.contact_range);
        self.append_row(&target, &CONTACT_HEADER, row).await
    }

    async fn append_row(&self, target: &SheetTarget, header: &[&str], row: Vec<Value>) -> AppendOutcome {
        let Some(spreadsheet_id) = self.spreadsheet_id.as_deref() else {
            return AppendOutcome::Skipped("Missing GOOGLE_SHEETS_SPREADSHEET_ID env var".to_string());
        };
        let Some(creds) = self.oauth.refresh_credentials() else {
            return AppendOutcome::Skipped(
                "Missing GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET/GOOGLE_REFRESH_TOKEN env vars".to_string(),
            );
        };

        let token = match self.oauth.access_token(&creds).await {
            Ok(token) => token,
            Err(e) => return AppendOutcome::Failed(format!("{:#}", e)),
        };

        // Setup is best-effort: the data write is attempted regardless.
        if let Some(title) = &target.title {
            if let Err(e) = self.ensure_sheet(&token, spreadsheet_id, title).await {
                warn!("Could not verify sheet '{}': {:#}", title, e);
            }
        }
        if let Err(e) = self.ensure_header(&token, spreadsheet_id, target, header).await {
            warn!("Could not verify header row for {}: {:#}", target.range, e);
        }

        match self.append_values(&token, spreadsheet_id, &target.range, row).await {
            Ok(()) => AppendOutcome::Appended,
            Err(e) => AppendOutcome::Failed(format!("{:#}", e)),
        }
    }

    async fn ensure_sheet(&self, token: &str, spreadsheet_id: &str, title: &str) -> Result<()> {
        let mut url = self.endpoint(&[spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Spreadsheet metadata request failed")?;
        let meta: SpreadsheetMeta = checked(response, "read spreadsheet metadata")
            .await?
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")?;

        if meta.sheets.iter().any(|s| s.properties.title == title) {
            return Ok(());
        }

        info!("Creating sheet '{}'", title);
        let url = self.endpoint(&[&format!("{}:batchUpdate", spreadsheet_id)])?;
        let body = json!({ "requests": [{ "addSheet": { "properties": { "title": title } } }] });
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("Add sheet request failed")?;
        checked(response, "add sheet").await?;
        Ok(())
    }

    async fn ensure_header(
        &self,
        token: &str,
        spreadsheet_id: &str,
        target: &SheetTarget,
        header: &[&str],
    ) -> Result<()> {
        let header_range = target.header_range(header.len());
        let url = self.endpoint(&[spreadsheet_id, "values", &header_range])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Header read request failed")?;
        let existing: ValueRange = checked(response, "read header row")
            .await?
            .json()
            .await
            .context("Failed to parse header row")?;

        let first_row_empty = existing.values.first().map_or(true, |row| {
            row.iter()
                .all(|cell| cell.as_str().map_or(cell.is_null(), |s| s.trim().is_empty()))
        });
        if !first_row_empty {
            return Ok(());
        }

        info!("Writing header row to {}", header_range);
        let mut url = self.endpoint(&[spreadsheet_id, "values", &header_range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&json!({ "values": [header] }))
            .send()
            .await
            .context("Header write request failed")?;
        checked(response, "write header row").await?;
        Ok(())
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<Value>,
    ) -> Result<()> {
        let mut url = self.endpoint(&[spreadsheet_id, "values", &format!("{}:append", range)])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .context("Append request failed")?;
        checked(response, "append to Google Sheet").await?;
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid Sheets base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets base URL cannot have a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }
}

async fn checked(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Failed to {} ({})", what, status));
    anyhow::bail!(message)
}
