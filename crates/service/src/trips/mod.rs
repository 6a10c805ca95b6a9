//! Trip state, its store and the background writer that persists it.

pub mod state;
pub mod store;
pub mod writer;

pub use state::{Change, TripAction, TripsState};
pub use store::{LoadReport, StoreOptions, TripStore, LEGACY_IMAGES_KEY, TRIPS_KEY};
pub use writer::PersistWriter;
