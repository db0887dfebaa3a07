pub mod config;
pub mod google;
pub mod model;
pub mod storage;
pub mod valuation;
pub mod web;
