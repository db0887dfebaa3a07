use anyhow::Result;
use tracing::{error, info, warn};

use super::EstimateProvider;
use crate::model::{PropertyDescription, ValuationEstimate};

pub struct ValuationRequester {
    primary: Option<Box<dyn EstimateProvider>>,
    secondary: Box<dyn EstimateProvider>,
}

impl ValuationRequester {
    pub fn new(
        primary: Option<Box<dyn EstimateProvider>>,
        secondary: Box<dyn EstimateProvider>,
    ) -> Self {
        if primary.is_none() {
            info!(
                "Primary valuation provider not configured, using {} only",
                secondary.name()
            );
        }
        Self { primary, secondary }
    }

    pub async fn request(&self, property: &PropertyDescription) -> Result<ValuationEstimate> {
        if let Some(primary) = &self.primary {
            info!("Requesting {} estimate", primary.name());
            match primary.estimate(property).await {
                Ok(raw) => {
                    info!("{} estimate succeeded", primary.name());
                    return Ok(raw.normalize());
                }
                Err(e) => warn!(
                    "{} estimate failed, falling back to {}: {:#}",
                    primary.name(),
                    self.secondary.name(),
                    e
                ),
            }
        }

        info!("Requesting {} estimate", self.secondary.name());
        match self.secondary.estimate(property).await {
            Ok(raw) => {
                info!("{} estimate succeeded", self.secondary.name());
                Ok(raw.normalize())
            }
            Err(e) => {
                error!("{} estimate also failed: {:#}", self.secondary.name(), e);
                Err(e.context("All valuation providers failed"))
            }
        }
    }
}
