use models::{Coordinates, ImageDraft, Trip};
use tracing::debug;

use crate::errors::ServiceError;
use crate::geocode::client::{GeocodeError, Geocoder};
use crate::storage::kv::KvBackend;
use crate::trips::TripStore;

/// Transient map state behind the location search and map view.
///
/// Searching and panning only change this state. The trip's stored anchor
/// moves only through [`LocationPicker::confirm`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationPicker {
    region: Option<Coordinates>,
    error: Option<String>,
}

impl LocationPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a trip's confirmed anchor, if it has one.
    pub fn for_trip(trip: &Trip) -> Self {
        Self { region: trip.coordinates.map(|c| c.region_or_default()), error: None }
    }

    pub fn region(&self) -> Option<Coordinates> {
        self.region
    }

    /// Inline error from the last search.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Look up a place name. A miss clears the region, other failures keep it.
    pub async fn search<G>(&mut self, geocoder: &G, query: &str) -> Result<Coordinates, GeocodeError>
    where
        G: Geocoder + ?Sized,
    {
        match geocoder.locate(query).await {
            Ok(region) => {
                self.region = Some(region);
                self.error = None;
                Ok(region)
            }
            Err(e) => {
                if e == GeocodeError::NotFound {
                    self.region = None;
                }
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// The user panned or zoomed the map.
    pub fn on_region_change(&mut self, region: Coordinates) {
        self.region = Some(region);
    }

    /// The user tapped the map: re-centre there and, if the picker returned a
    /// photo, start a draft pinned at the tap.
    pub fn on_map_press(&mut self, at: Coordinates, picked_uri: Option<&str>) -> Option<ImageDraft> {
        self.region = Some(at.center().region_or_default());
        let uri = picked_uri?;
        ImageDraft::at(uri, at.center()).ok()
    }

    /// Save the current region as the trip's anchor. Returns `false` when
    /// there is nothing to confirm.
    pub async fn confirm<B>(&self, store: &TripStore<B>, trip: &str) -> Result<bool, ServiceError>
    where
        B: KvBackend + ?Sized + 'static,
    {
        let Some(region) = self.region else {
            debug!(%trip, "no region to confirm");
            return Ok(false);
        };
        store.set_coordinates_for_trip(trip, region).await?;
        Ok(true)
    }
}
