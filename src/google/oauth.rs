use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::{GoogleConfig, Secrets};

pub struct OAuthClient {
    client: Client,
    token_url: String,
    auth_url: String,
    scope: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

pub struct RefreshCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug)]
pub enum CodeExchange {
    /// `None` when Google decided consent was already granted and sent no refresh token.
    Granted { refresh_token: Option<String> },
    Rejected { status: StatusCode, body: Value },
}

impl OAuthClient {
    pub fn new(client: Client, config: &GoogleConfig, secrets: &Secrets) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            auth_url: config.auth_url.clone(),
            scope: config.scope.clone(),
            client_id: secrets.google_client_id.clone(),
            client_secret: secrets.google_client_secret.clone(),
            refresh_token: secrets.google_refresh_token.clone(),
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn refresh_credentials(&self) -> Option<RefreshCredentials<'_>> {
        Some(RefreshCredentials {
            client_id: self.client_id.as_deref()?,
            client_secret: self.client_secret.as_deref()?,
            refresh_token: self.refresh_token.as_deref()?,
        })
    }

    pub async fn access_token(&self, creds: &RefreshCredentials<'_>) -> Result<String> {
        let params = [
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
            ("refresh_token", creds.refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .context("Google token request failed")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let reason = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to fetch access token ({})", status));
            anyhow::bail!(reason);
        }

        let token: TokenResponse =
            serde_json::from_value(body).context("Failed to parse Google token response")?;
        token
            .access_token
            .filter(|t| !t.is_empty())
            .context("Google token response missing access_token")
    }

    pub fn consent_url(&self, client_id: &str, redirect_uri: &str, state: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent select_account"),
                ("include_granted_scopes", "true"),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )
        .context("Invalid Google auth URL")
    }

    pub async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeExchange> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .context("Google token request failed")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Ok(CodeExchange::Rejected { status, body });
        }

        let token: TokenResponse =
            serde_json::from_value(body).context("Failed to parse Google token response")?;
        Ok(CodeExchange::Granted {
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}
