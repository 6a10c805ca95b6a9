use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::coordinates::Coordinates;
use crate::errors::ModelError;
use crate::image::ImageEntry;

/// Trip name to trip record, in insertion order. This is the whole persisted state.
pub type TripsMapping = IndexMap<String, Trip>;

/// A named collection of images plus an optional anchor map location.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TripRepr")]
pub struct Trip {
    pub images: Vec<ImageEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Stored trips come in two shapes: the current object form, and an early
/// layout where a trip was just its image array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TripRepr {
    Images(Vec<ImageEntry>),
    Record {
        #[serde(default)]
        images: Vec<ImageEntry>,
        #[serde(default)]
        coordinates: Option<Coordinates>,
    },
}

impl From<TripRepr> for Trip {
    fn from(repr: TripRepr) -> Self {
        match repr {
            TripRepr::Images(images) => Trip { images, coordinates: None },
            TripRepr::Record { images, coordinates } => Trip { images, coordinates },
        }
    }
}

/// One map marker: an image that carries a location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapPin {
    pub coordinates: Coordinates,
    pub title: String,
    pub note: String,
    pub uri: String,
}

impl Trip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins for every image with coordinates, in insertion order.
    pub fn map_pins(&self) -> Vec<MapPin> {
        self.images
            .iter()
            .filter_map(|img| {
                img.coordinates.map(|coordinates| MapPin {
                    coordinates,
                    title: img.note.clone(),
                    note: img.note.clone(),
                    uri: img.uri.clone(),
                })
            })
            .collect()
    }
}

/// Trim a user-entered trip name; blank names are rejected.
pub fn normalize_trip_name(name: &str) -> Result<String, ModelError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ModelError::Validation("trip name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Parse a persisted `trips` blob.
pub fn trips_from_json(blob: &str) -> Result<TripsMapping, ModelError> {
    Ok(serde_json::from_str(blob)?)
}

/// Serialize the mapping into the persisted `trips` blob.
pub fn trips_to_json(trips: &TripsMapping) -> Result<String, ModelError> {
    Ok(serde_json::to_string(trips)?)
}
