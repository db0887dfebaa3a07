use reqwest::Client;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::google::{OAuthClient, SheetsClient};
use crate::storage::{LeadStore, SubmissionPersister};
use crate::valuation::{DeepSeekProvider, EstimateProvider, RepliersProvider, ValuationRequester};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub requester: Arc<ValuationRequester>,
    pub persister: Arc<SubmissionPersister>,
    pub sheets: Arc<SheetsClient>,
    pub oauth: Arc<OAuthClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let client = Client::new();
        let secrets = &config.secrets;

        let primary = secrets.deepseek_api_key.clone().map(|key| {
            Box::new(DeepSeekProvider::new(client.clone(), &config.valuation, key))
                as Box<dyn EstimateProvider>
        });
        let secondary = Box::new(RepliersProvider::new(
            client.clone(),
            &config.valuation,
            secrets.repliers_api_key.clone(),
        ));
        let requester = Arc::new(ValuationRequester::new(primary, secondary));

        let oauth = Arc::new(OAuthClient::new(client.clone(), &config.google, secrets));
        let sheets = Arc::new(SheetsClient::new(
            client,
            oauth.clone(),
            &config.google,
            secrets,
        ));
        let store = Arc::new(LeadStore::new(&config.database));
        let persister = Arc::new(SubmissionPersister::new(store, sheets.clone()));

        Self {
            config: Arc::new(config),
            requester,
            persister,
            sheets,
            oauth,
        }
    }
}
