pub mod deepseek;
pub mod repliers;
pub mod requester;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{PropertyDescription, ProviderEstimate};

pub use deepseek::DeepSeekProvider;
pub use repliers::RepliersProvider;
pub use requester::ValuationRequester;

#[async_trait]
pub trait EstimateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn estimate(&self, property: &PropertyDescription) -> Result<ProviderEstimate>;
}
