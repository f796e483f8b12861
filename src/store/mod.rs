pub mod error;
pub mod persistence;
pub mod time_series_store;
