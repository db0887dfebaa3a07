pub mod db;
pub mod persister;

pub use db::{ContactRecord, LeadRecord, LeadStore};
pub use persister::{ContactOutcome, LeadOutcome, SubmissionPersister};
