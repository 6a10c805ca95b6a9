//! Service layer for the travel scrapbook.
//! - `trips`: the trip store, its pure reducer and the background writer.
//! - `storage`: key-value blob backends the store persists through.
//! - `geocode`: place-name lookup and the map location picker.

pub mod errors;
pub mod storage;
pub mod trips;
pub mod geocode;

pub use errors::ServiceError;
pub use trips::{LoadReport, StoreOptions, TripStore};
