use serde::{Deserialize, Serialize};

/// Zoom span applied by the map view when a region carries no deltas.
pub const DEFAULT_REGION_DELTA: f64 = 0.1;

/// A map viewport (center plus zoom deltas) or a bare pin location.
///
/// No range validation is performed; any float is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude_delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude_delta: Option<f64>,
}

impl Coordinates {
    /// A pin location without zoom information.
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, latitude_delta: None, longitude_delta: None }
    }

    /// A viewport with explicit deltas.
    pub fn region(latitude: f64, longitude: f64, latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude,
            longitude,
            latitude_delta: Some(latitude_delta),
            longitude_delta: Some(longitude_delta),
        }
    }

    /// Viewport for rendering: missing deltas become [`DEFAULT_REGION_DELTA`].
    ///
    /// Only map-facing callers use this. Stored coordinates keep whatever was given.
    pub fn region_or_default(&self) -> Self {
        Self {
            latitude: self.latitude,
            longitude: self.longitude,
            latitude_delta: Some(self.latitude_delta.unwrap_or(DEFAULT_REGION_DELTA)),
            longitude_delta: Some(self.longitude_delta.unwrap_or(DEFAULT_REGION_DELTA)),
        }
    }

    /// Drop the zoom deltas, keeping the center.
    pub fn center(&self) -> Self {
        Self::point(self.latitude, self.longitude)
    }
}
