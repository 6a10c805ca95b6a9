//! Data model for the travel scrapbook.
//!
//! The persisted state is a single [`TripsMapping`]: trip name to [`Trip`], each
//! trip holding its [`ImageEntry`] list and an optional anchor [`Coordinates`].
//! JSON field names follow the camelCase layout of previously stored blobs.

pub mod errors;
pub mod coordinates;
pub mod image;
pub mod trip;

#[cfg(test)]
mod tests;

pub use coordinates::{Coordinates, DEFAULT_REGION_DELTA};
pub use errors::ModelError;
pub use image::{stored_precision, ImageDraft, ImageEntry};
pub use trip::{normalize_trip_name, trips_from_json, trips_to_json, MapPin, Trip, TripsMapping};
