//! Place-name lookup and the map-side location state built on it.

pub mod client;
pub mod location;

pub use client::{GeocodeError, Geocoder, HereGeocoder};
pub use location::LocationPicker;
