pub mod aemet;
pub mod error;
pub mod factory;
pub(crate) mod http;
pub mod meteocat;
pub mod traits;
