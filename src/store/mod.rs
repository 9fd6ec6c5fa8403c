pub mod client;
pub mod document;
pub mod query;
pub mod response;

pub use client::{AnalyticsStore, MinMaxStat, StoreError};
