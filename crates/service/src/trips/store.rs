use std::sync::{Arc, Mutex};
use std::time::Duration;

use models::{trips_from_json, trips_to_json, Coordinates, ImageEntry, MapPin, Trip, TripsMapping};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::errors::ServiceError;
use crate::storage::kv::KvBackend;
use crate::trips::state::{Change, TripAction, TripsState};
use crate::trips::writer::PersistWriter;

/// Key holding the serialized trips mapping.
pub const TRIPS_KEY: &str = "trips";
/// Key of the early flat image list, read once for migration.
pub const LEGACY_IMAGES_KEY: &str = "images";

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// Coalescing window for background writes.
    pub debounce: Duration,
    /// Trip that receives images migrated from [`LEGACY_IMAGES_KEY`].
    pub legacy_trip_name: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { debounce: Duration::ZERO, legacy_trip_name: "Scrapbook".into() }
    }
}

/// What the last [`TripStore::load_all`] found on the backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub trips_loaded: usize,
    /// The stored blob was not a valid trips mapping and was ignored.
    pub malformed: bool,
    /// The backend read itself failed.
    pub read_failed: bool,
    /// Images moved over from the legacy flat list.
    pub migrated_images: usize,
}

/// Single source of truth for trips, images and anchor coordinates.
///
/// Every mutation updates memory first, then queues a full snapshot of the
/// mapping to the background writer without waiting for it. Write failures are
/// logged and never roll back memory; [`TripStore::flush`] reports them.
pub struct TripStore<B: KvBackend + ?Sized + 'static> {
    state: RwLock<TripsState>,
    backend: Arc<B>,
    writer: PersistWriter,
    options: StoreOptions,
    last_load: Mutex<LoadReport>,
}

impl<B: KvBackend + ?Sized + 'static> TripStore<B> {
    /// Build an empty store without reading the backend.
    ///
    /// Spawns the background writer, so it runs on the caller's tokio runtime.
    pub async fn new(backend: Arc<B>, options: StoreOptions) -> Arc<Self> {
        let writer = PersistWriter::spawn(backend.clone(), TRIPS_KEY, options.debounce);
        Arc::new(Self {
            state: RwLock::new(TripsState::default()),
            backend,
            writer,
            options,
            last_load: Mutex::new(LoadReport::default()),
        })
    }

    /// Build the store and load persisted trips. Never fails; see [`LoadReport`].
    pub async fn load(backend: Arc<B>, options: StoreOptions) -> Arc<Self> {
        let store = Self::new(backend, options).await;
        store.load_all().await;
        store
    }

    /// Read the persisted mapping and replace in-memory state with it.
    ///
    /// Absent, unreadable or malformed data all load as an empty mapping.
    /// Selection moves to the first trip, or none.
    pub async fn load_all(&self) -> TripsMapping {
        let (trips, report) = self.read_persisted().await;
        let migrated = report.migrated_images > 0;

        let mut state = self.state.write().await;
        *state = TripsState::new(trips.clone());
        if migrated {
            self.schedule_persist(&state.trips);
        }
        drop(state);

        info!(
            event = "trips_loaded",
            trips = report.trips_loaded,
            malformed = report.malformed,
            read_failed = report.read_failed,
            migrated_images = report.migrated_images,
            "trip store loaded"
        );
        *self.last_load.lock().unwrap_or_else(|e| e.into_inner()) = report;
        trips
    }

    async fn read_persisted(&self) -> (TripsMapping, LoadReport) {
        let mut report = LoadReport::default();

        let blob = match self.backend.get(TRIPS_KEY).await {
            Ok(blob) => blob,
            Err(e) => {
                error!(key = TRIPS_KEY, error = %e, "failed to read trips; starting empty");
                report.read_failed = true;
                return (TripsMapping::new(), report);
            }
        };

        let trips = match blob {
            Some(blob) => trips_from_json(&blob).unwrap_or_else(|e| {
                warn!(key = TRIPS_KEY, error = %e, "stored trips are malformed; starting empty");
                report.malformed = true;
                TripsMapping::new()
            }),
            None => self.read_legacy_images(&mut report).await,
        };
        report.trips_loaded = trips.len();
        (trips, report)
    }

    /// Early builds kept one flat image list; fold it into a single trip.
    async fn read_legacy_images(&self, report: &mut LoadReport) -> TripsMapping {
        let mut trips = TripsMapping::new();
        let blob = match self.backend.get(LEGACY_IMAGES_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return trips,
            Err(e) => {
                warn!(key = LEGACY_IMAGES_KEY, error = %e, "failed to read legacy images");
                return trips;
            }
        };
        match serde_json::from_str::<Vec<ImageEntry>>(&blob) {
            Ok(images) if !images.is_empty() => {
                report.migrated_images = images.len();
                info!(
                    trip = %self.options.legacy_trip_name,
                    images = images.len(),
                    "migrating legacy image list"
                );
                trips.insert(self.options.legacy_trip_name.clone(), Trip { images, coordinates: None });
            }
            Ok(_) => {}
            Err(e) => warn!(key = LEGACY_IMAGES_KEY, error = %e, "legacy images are malformed; ignored"),
        }
        trips
    }

    async fn dispatch(&self, action: TripAction) -> Result<Change, ServiceError> {
        let mut state = self.state.write().await;
        let change = state.apply(action)?;
        if change.needs_persist() {
            // serialized under the lock so snapshots queue in mutation order
            self.schedule_persist(&state.trips);
        }
        Ok(change)
    }

    fn schedule_persist(&self, trips: &TripsMapping) {
        match trips_to_json(trips) {
            Ok(payload) => {
                let seq = self.writer.save(payload);
                debug!(seq, trips = trips.len(), "trips snapshot queued");
            }
            Err(e) => error!(error = %e, "failed to serialize trips; snapshot skipped"),
        }
    }

    /// Overwrite the whole mapping and persist it.
    pub async fn replace_all(&self, trips: TripsMapping) {
        // ReplaceAll cannot fail
        let _ = self.dispatch(TripAction::ReplaceAll(trips)).await;
    }

    /// Create an empty trip. Blank names are rejected, existing names are
    /// [`ServiceError::DuplicateTripName`]. Returns the stored (trimmed) name.
    pub async fn add_trip(&self, name: &str) -> Result<String, ServiceError> {
        let name = models::normalize_trip_name(name)?;
        self.dispatch(TripAction::AddTrip(name.clone())).await?;
        info!(trip = %name, "trip added");
        Ok(name)
    }

    /// Replace the image list of a trip, keeping its coordinates.
    pub async fn set_images_for_trip(&self, trip: &str, images: Vec<ImageEntry>) -> Result<(), ServiceError> {
        self.dispatch(TripAction::SetImages { trip: trip.to_string(), images }).await?;
        Ok(())
    }

    /// Set the anchor coordinates of a trip exactly as given, keeping its images.
    pub async fn set_coordinates_for_trip(&self, trip: &str, coordinates: Coordinates) -> Result<(), ServiceError> {
        self.dispatch(TripAction::SetCoordinates { trip: trip.to_string(), coordinates }).await?;
        info!(trip = %trip, lat = coordinates.latitude, lng = coordinates.longitude, "trip location confirmed");
        Ok(())
    }

    /// Change which trip the UI shows. `""` clears the selection. Not persisted.
    pub async fn update_selected_trip(&self, trip: &str) -> Result<(), ServiceError> {
        self.dispatch(TripAction::SelectTrip(trip.to_string())).await?;
        Ok(())
    }

    /// Remove a trip with all its images. A deleted selection falls back to
    /// the first remaining trip, or none.
    pub async fn delete_trip(&self, trip: &str) -> Result<(), ServiceError> {
        self.dispatch(TripAction::DeleteTrip(trip.to_string())).await?;
        info!(trip = %trip, "trip deleted");
        Ok(())
    }

    /// Append one image to a trip.
    pub async fn add_image(&self, trip: &str, image: ImageEntry) -> Result<(), ServiceError> {
        self.dispatch(TripAction::AddImage { trip: trip.to_string(), image }).await?;
        Ok(())
    }

    /// Replace the note of the image(s) with this uri.
    pub async fn edit_note(&self, trip: &str, uri: &str, note: &str) -> Result<(), ServiceError> {
        self.dispatch(TripAction::EditNote { trip: trip.to_string(), uri: uri.to_string(), note: note.to_string() })
            .await?;
        Ok(())
    }

    /// Remove the image(s) with this uri; returns whether anything was removed.
    pub async fn delete_image(&self, trip: &str, uri: &str) -> Result<bool, ServiceError> {
        let change = self
            .dispatch(TripAction::DeleteImage { trip: trip.to_string(), uri: uri.to_string() })
            .await?;
        Ok(change.needs_persist())
    }

    /// Snapshot of the whole mapping.
    pub async fn trips(&self) -> TripsMapping {
        self.state.read().await.trips.clone()
    }

    pub async fn trip(&self, name: &str) -> Option<Trip> {
        self.state.read().await.trips.get(name).cloned()
    }

    /// Name of the selected trip.
    pub async fn selected(&self) -> Option<String> {
        self.state.read().await.selected.clone()
    }

    /// The selected trip with its name; `None` means the UI should prompt for a new trip.
    pub async fn selected_trip(&self) -> Option<(String, Trip)> {
        let state = self.state.read().await;
        state.selected_trip().map(|(name, trip)| (name.to_string(), trip.clone()))
    }

    /// Map markers for a trip's located images.
    pub async fn map_pins(&self, trip: &str) -> Result<Vec<MapPin>, ServiceError> {
        let state = self.state.read().await;
        let trip = state.trips.get(trip).ok_or_else(|| ServiceError::trip_not_found(trip))?;
        Ok(trip.map_pins())
    }

    pub fn last_load(&self) -> LoadReport {
        self.last_load.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Wait for all queued writes; returns the outcome of the most recent one.
    pub async fn flush(&self) -> Result<(), ServiceError> {
        self.writer.flush().await
    }
}
