//! Pure trip state and its reducer.
//!
//! [`TripsState::apply`] is the only place the mapping changes. It never
//! touches storage; the store decides what to persist from the returned
//! [`Change`].

use models::{normalize_trip_name, Coordinates, ImageEntry, Trip, TripsMapping};

use crate::errors::ServiceError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TripsState {
    pub trips: TripsMapping,
    /// Trip currently shown by the UI. Never persisted.
    pub selected: Option<String>,
}

/// One mutation of the trip state.
#[derive(Clone, Debug, PartialEq)]
pub enum TripAction {
    ReplaceAll(TripsMapping),
    AddTrip(String),
    SetImages { trip: String, images: Vec<ImageEntry> },
    SetCoordinates { trip: String, coordinates: Coordinates },
    SelectTrip(String),
    DeleteTrip(String),
    AddImage { trip: String, image: ImageEntry },
    EditNote { trip: String, uri: String, note: String },
    DeleteImage { trip: String, uri: String },
}

/// What an applied action touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// Nothing changed.
    None,
    /// Only the transient selection changed.
    Selection,
    /// The persisted mapping changed.
    Mapping,
}

impl Change {
    pub fn needs_persist(self) -> bool {
        self == Change::Mapping
    }
}

impl TripsState {
    pub fn new(trips: TripsMapping) -> Self {
        let selected = trips.keys().next().cloned();
        Self { trips, selected }
    }

    /// Apply one action. On error the state is left as it was.
    pub fn apply(&mut self, action: TripAction) -> Result<Change, ServiceError> {
        match action {
            TripAction::ReplaceAll(trips) => {
                self.trips = trips;
                self.reconcile_selection();
                Ok(Change::Mapping)
            }
            TripAction::AddTrip(name) => {
                let name = normalize_trip_name(&name)?;
                if self.trips.contains_key(&name) {
                    return Err(ServiceError::DuplicateTripName(name));
                }
                self.trips.insert(name.clone(), Trip::new());
                if self.selected.is_none() {
                    self.selected = Some(name);
                }
                Ok(Change::Mapping)
            }
            TripAction::SetImages { trip, images } => {
                self.trip_mut(&trip)?.images = images;
                Ok(Change::Mapping)
            }
            TripAction::SetCoordinates { trip, coordinates } => {
                self.trip_mut(&trip)?.coordinates = Some(coordinates);
                Ok(Change::Mapping)
            }
            TripAction::SelectTrip(name) => {
                if name.is_empty() {
                    self.selected = None;
                } else if self.trips.contains_key(&name) {
                    self.selected = Some(name);
                } else {
                    return Err(ServiceError::trip_not_found(&name));
                }
                Ok(Change::Selection)
            }
            TripAction::DeleteTrip(name) => {
                if self.trips.shift_remove(&name).is_none() {
                    return Err(ServiceError::trip_not_found(&name));
                }
                self.reconcile_selection();
                Ok(Change::Mapping)
            }
            TripAction::AddImage { trip, image } => {
                self.trip_mut(&trip)?.images.push(image);
                Ok(Change::Mapping)
            }
            TripAction::EditNote { trip, uri, note } => {
                let entry = self.trip_mut(&trip)?;
                let mut matched = false;
                for img in entry.images.iter_mut().filter(|img| img.uri == uri) {
                    img.note = note.clone();
                    matched = true;
                }
                if !matched {
                    return Err(ServiceError::NotFound(format!("image '{}' not found in trip '{}'", uri, trip)));
                }
                Ok(Change::Mapping)
            }
            TripAction::DeleteImage { trip, uri } => {
                let entry = self.trip_mut(&trip)?;
                let before = entry.images.len();
                entry.images.retain(|img| img.uri != uri);
                if entry.images.len() == before {
                    return Ok(Change::None);
                }
                Ok(Change::Mapping)
            }
        }
    }

    /// The selected trip, if the selection still names an existing trip.
    pub fn selected_trip(&self) -> Option<(&str, &Trip)> {
        let name = self.selected.as_deref()?;
        self.trips.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }

    fn trip_mut(&mut self, name: &str) -> Result<&mut Trip, ServiceError> {
        self.trips.get_mut(name).ok_or_else(|| ServiceError::trip_not_found(name))
    }

    /// Keep the selection if it still exists, else fall back to the first trip or none.
    fn reconcile_selection(&mut self) {
        let still_there = self.selected.as_ref().is_some_and(|s| self.trips.contains_key(s));
        if !still_there {
            self.selected = self.trips.keys().next().cloned();
        }
    }
}
