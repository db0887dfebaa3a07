pub mod oauth;
pub mod rows;
pub mod sheets;

pub use oauth::{CodeExchange, OAuthClient};
pub use sheets::{AppendOutcome, SheetsClient};
