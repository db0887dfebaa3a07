use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub valuation: ValuationConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    // Loaded from env
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Adds `Secure` to the OAuth state cookie. Enable behind HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/homeval.db".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Region named in the valuation prompt.
    pub market: String,
    pub deepseek_base_url: String,
    pub deepseek_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub repliers_base_url: String,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            market: "Ontario, Canada".to_string(),
            deepseek_base_url: "https://api.deepseek.com/v1".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            repliers_base_url: "https://api.repliers.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub token_url: String,
    pub auth_url: String,
    pub sheets_base_url: String,
    pub scope: String,
    pub leads_sheet: String,
    pub contact_sheet: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            sheets_base_url: "https://sheets.googleapis.com".to_string(),
            scope: "https://www.googleapis.com/auth/spreadsheets".to_string(),
            leads_sheet: "Leads".to_string(),
            contact_sheet: "Contact Us".to_string(),
        }
    }
}

/// Every alias is resolved here, once. Nothing else in the crate reads env vars.
#[derive(Clone, Default)]
pub struct Secrets {
    pub deepseek_api_key: Option<String>,
    pub repliers_api_key: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    /// Bare spreadsheet id or a full spreadsheet URL.
    pub spreadsheet_id: Option<String>,
    pub sheets_range: Option<String>,
    pub oauth_redirect_uri: Option<String>,
    pub database_url: Option<String>,
}

// Values stay out of logs; only presence is shown.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("deepseek_api_key", &self.deepseek_api_key.is_some())
            .field("repliers_api_key", &self.repliers_api_key.is_some())
            .field("google_client_id", &self.google_client_id.is_some())
            .field("google_client_secret", &self.google_client_secret.is_some())
            .field("google_refresh_token", &self.google_refresh_token.is_some())
            .field("spreadsheet_id", &self.spreadsheet_id.is_some())
            .field("sheets_range", &self.sheets_range)
            .field("oauth_redirect_uri", &self.oauth_redirect_uri)
            .field("database_url", &self.database_url.is_some())
            .finish()
    }
}

impl Secrets {
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        Self {
            deepseek_api_key: first(&["DEEPSEEK_API_KEY"]),
            repliers_api_key: first(&["REPLIERS_API_KEY"]),
            google_client_id: first(&["GOOGLE_OAUTH_CLIENT_ID", "GOOGLE_CLIENT_ID"]),
            google_client_secret: first(&["GOOGLE_OAUTH_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"]),
            google_refresh_token: first(&["GOOGLE_OAUTH_REFRESH_TOKEN", "GOOGLE_REFRESH_TOKEN"]),
            spreadsheet_id: first(&["GOOGLE_SHEETS_SPREADSHEET_ID"]),
            sheets_range: first(&["GOOGLE_SHEETS_RANGE"]),
            oauth_redirect_uri: first(&["GOOGLE_OAUTH_REDIRECT_URI"]),
            database_url: first(&["DATABASE_URL"]),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("HOMEVAL_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let config_text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path))?;

        Self::from_toml_str(&config_text, |name| std::env::var(name).ok())
            .with_context(|| format!("Failed to parse {}", path))
    }

    pub fn from_toml_str(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(text)?;
        config.secrets = Secrets::resolve(lookup);

        if let Some(url) = &config.secrets.database_url {
            config.database.url = url.clone();
        }

        Ok(config)
    }
}
