pub mod aggregation;
pub mod observation;
pub mod payload;
pub mod provider_kind;
pub mod variable;
pub mod weather_table;
