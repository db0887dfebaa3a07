pub mod estimate;
mod lenient;
pub mod property;
pub mod submission;

pub use estimate::{EstimateSource, EstimateSummary, ProviderEstimate, ValuationEstimate};
pub use property::PropertyDescription;
pub use submission::{ContactSubmission, LeadSubmission};
