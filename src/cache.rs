//! Photo sets for pins: served from the store when present, otherwise
//! searched for, stored as placeholders and downloaded in the
//! background.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{BoxStream, StreamExt};
use log::{debug, info, o, trace, warn, Logger};
use rand::Rng;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::{RemoteError, TouristError};
use crate::flickr::{PhotoApi, PhotoMetadata, SizeTag};
use crate::geo::Precision;
use crate::photo::{Photo, PhotoSource};
use crate::pin::Pin;

/// The highest page worth asking for. The API stops at 4000 results and
/// answers anything past that with page 1.
pub const MAX_PAGE: u32 = 130;

const FIRST_PAGE: u32 = 1;

/// Picks the page for a fresh photo set: uniform over the pages the
/// previous search reported, capped at [`MAX_PAGE`], or the first page
/// when nothing is known.
pub fn choose_page<R: Rng + ?Sized>(previous_pages: Option<u32>, rng: &mut R) -> u32 {
    match previous_pages {
        None | Some(0) => FIRST_PAGE,
        Some(pages) => rng.gen_range(FIRST_PAGE..=pages.min(MAX_PAGE)),
    }
}

/// How searches are made and which image size is fetched.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheSettings {
    pub precision: Precision,
    pub size: SizeTag,
}

/// The result of asking for a pin's photos.
#[derive(Debug)]
pub enum PhotoLoad {
    /// The store already had photos; nothing was searched for. Some may
    /// still be placeholders.
    Cached(Vec<Photo>),

    /// The search found nothing. Not an error.
    NoPhotosAtLocation,

    /// A search succeeded and downloads are under way.
    Fetching(PhotoSet),
}

/// A freshly searched photo set.
pub struct PhotoSet {
    pub page: u32,
    pub pages: u32,
    pub total: u64,

    /// One placeholder per search result, in result order.
    pub placeholders: Vec<Photo>,

    /// Yields once per placeholder, in completion order, then ends.
    pub resolutions: BoxStream<'static, Resolution>,
}

impl fmt::Debug for PhotoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoSet")
            .field("page", &self.page)
            .field("pages", &self.pages)
            .field("total", &self.total)
            .field("placeholders", &self.placeholders.len())
            .finish()
    }
}

/// The outcome of one placeholder's download.
#[derive(Debug)]
pub struct Resolution {
    pub photo_id: Uuid,

    /// The resolved photo, or why it stayed a placeholder.
    pub outcome: Result<Photo, TouristError>,
}

#[derive(Default)]
struct PinState {
    /// Bumped by every search; downloads from older searches are
    /// discarded.
    generation: u64,

    /// The page count reported by the latest search.
    pages: Option<u32>,

    /// Serializes loads and refreshes of the pin.
    operation: Arc<tokio::sync::Mutex<()>>,
}

type PinStates = Arc<Mutex<HashMap<Uuid, PinState>>>;

pub struct PhotoCache {
    logger: Arc<Logger>,
    db: Arc<dyn Db + Send + Sync>,
    api: Arc<dyn PhotoApi>,
    settings: CacheSettings,
    states: PinStates,
}

impl PhotoCache {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        api: Arc<dyn PhotoApi>,
        settings: CacheSettings,
    ) -> Self {
        PhotoCache {
            logger,
            db,
            api,
            settings,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Returns the stored photos of the pin, or searches for the first
    /// page of photos if there are none.
    pub async fn load_photos(&self, pin: &Pin) -> Result<PhotoLoad, TouristError> {
        let logger = self.logger.new(o!("pin" => pin.id().to_string()));

        let operation = self.operation_lock(pin.id());
        let _guard = operation.lock().await;

        let photos = self.db.retrieve_photos(pin.id()).await?;

        if !photos.is_empty() {
            debug!(logger, "Loaded photos from store"; "count" => photos.len());
            return Ok(PhotoLoad::Cached(photos));
        }

        let generation = self.advance_generation(pin.id());
        debug!(logger, "No stored photos, searching..."; "generation" => generation);

        self.fetch(pin, FIRST_PAGE, generation, logger).await
    }

    /// Replaces the pin's photos with a randomly chosen page of results.
    /// `previous_pages` falls back to the page count of the last search
    /// made for the pin.
    pub async fn refresh_photos(
        &self,
        pin: &Pin,
        previous_pages: Option<u32>,
    ) -> Result<PhotoLoad, TouristError> {
        let logger = self.logger.new(o!("pin" => pin.id().to_string()));

        let operation = self.operation_lock(pin.id());
        let _guard = operation.lock().await;

        let previous_pages = previous_pages.or_else(|| self.known_pages(pin.id()));
        let page = choose_page(previous_pages, &mut rand::thread_rng());

        // downloads still running for the old set become stale here
        let generation = self.advance_generation(pin.id());

        let deleted = self.db.delete_photos(pin.id()).await?;
        info!(logger, "Replacing photo set"; "deleted" => ?deleted, "page" => page, "previous_pages" => ?previous_pages, "generation" => generation);

        self.fetch(pin, page, generation, logger).await
    }

    /// Drops everything known about the pin. Downloads still running for
    /// it are discarded when they finish.
    pub fn forget(&self, pin_id: &Uuid) {
        if let Some(state) = lock(&self.states).get_mut(pin_id) {
            state.generation += 1;
            state.pages = None;
        }
    }

    async fn fetch(
        &self,
        pin: &Pin,
        page: u32,
        generation: u64,
        logger: Logger,
    ) -> Result<PhotoLoad, TouristError> {
        let results = self
            .api
            .search(
                pin.latitude(),
                pin.longitude(),
                self.settings.precision,
                page,
            )
            .await?;

        let total = results
            .total_photos()
            .map_err(|_| TouristError::SearchFailed {
                source: RemoteError::InvalidTotal(results.total.clone()),
            })?;

        self.record_pages(pin.id(), generation, results.pages);

        // a page past the end of the results comes back empty too
        if total == 0 || results.photo.is_empty() {
            info!(logger, "No photos at location"; "page" => results.page, "total" => total);
            return Ok(PhotoLoad::NoPhotosAtLocation);
        }

        debug!(logger, "Creating placeholders..."; "page" => results.page, "pages" => results.pages, "total" => total, "count" => results.photo.len());

        let placeholders = match self.insert_placeholders(pin, &results.photo).await {
            Ok(placeholders) => placeholders,
            Err(e) => {
                let removed = self.db.delete_photos(pin.id()).await?;
                warn!(logger, "Could not store photo set"; "error" => %e, "removed" => ?removed);
                return Err(e);
            }
        };

        let (sender, receiver) = mpsc::unbounded_channel();

        for (photo, metadata) in placeholders.iter().zip(&results.photo) {
            self.spawn_download(photo, metadata.source(), generation, sender.clone(), &logger);
        }

        Ok(PhotoLoad::Fetching(PhotoSet {
            page: results.page,
            pages: results.pages,
            total,
            placeholders,
            resolutions: UnboundedReceiverStream::new(receiver).boxed(),
        }))
    }

    /// Stores one placeholder per result. Nothing is downloaded until
    /// every placeholder is in the store.
    async fn insert_placeholders(
        &self,
        pin: &Pin,
        results: &[PhotoMetadata],
    ) -> Result<Vec<Photo>, TouristError> {
        let mut placeholders = Vec::with_capacity(results.len());

        for metadata in results {
            placeholders.push(self.db.insert_photo(pin.id(), metadata.source()).await?);
        }

        Ok(placeholders)
    }

    fn spawn_download(
        &self,
        photo: &Photo,
        source: PhotoSource,
        generation: u64,
        sender: UnboundedSender<Resolution>,
        logger: &Logger,
    ) {
        let db = self.db.clone();
        let api = self.api.clone();
        let states = self.states.clone();
        let size = self.settings.size;

        let photo_id = *photo.id();
        let pin_id = *photo.pin_id();
        let logger = logger.new(o!("photo" => photo_id.to_string(), "generation" => generation));

        tokio::spawn(async move {
            let job = Download {
                photo_id,
                pin_id,
                source,
                size,
                generation,
            };
            let outcome = download(db, api, states, job).await;

            match &outcome {
                Ok(_) => trace!(logger, "Photo resolved"),
                Err(TouristError::StalePhotoSet { .. }) => {
                    debug!(logger, "Discarding download for replaced photo set")
                }
                Err(e) => warn!(logger, "Photo download failed"; "error" => %e),
            }

            // nobody may be listening any more
            let _ = sender.send(Resolution { photo_id, outcome });
        });
    }

    fn operation_lock(&self, pin_id: &Uuid) -> Arc<tokio::sync::Mutex<()>> {
        lock(&self.states)
            .entry(*pin_id)
            .or_default()
            .operation
            .clone()
    }

    fn advance_generation(&self, pin_id: &Uuid) -> u64 {
        let mut states = lock(&self.states);
        let state = states.entry(*pin_id).or_default();

        state.generation += 1;
        state.generation
    }

    fn known_pages(&self, pin_id: &Uuid) -> Option<u32> {
        lock(&self.states).get(pin_id).and_then(|s| s.pages)
    }

    fn record_pages(&self, pin_id: &Uuid, generation: u64, pages: u32) {
        let mut states = lock(&self.states);

        if let Some(state) = states.get_mut(pin_id) {
            if state.generation == generation {
                state.pages = Some(pages);
            }
        }
    }
}

/// One placeholder's pending download.
struct Download {
    photo_id: Uuid,
    pin_id: Uuid,
    source: PhotoSource,
    size: SizeTag,
    generation: u64,
}

async fn download(
    db: Arc<dyn Db + Send + Sync>,
    api: Arc<dyn PhotoApi>,
    states: PinStates,
    job: Download,
) -> Result<Photo, TouristError> {
    let Download {
        photo_id,
        pin_id,
        source,
        size,
        generation,
    } = job;

    let data = api.fetch_image_bytes(&source, size).await?;

    if !is_current(&states, &pin_id, generation) {
        return Err(TouristError::StalePhotoSet { pin_id, generation });
    }

    db.update_photo_data(&photo_id, data.clone()).await?;

    Ok(Photo::new(photo_id, pin_id, Some(source), Some(data)))
}

fn is_current(states: &PinStates, pin_id: &Uuid, generation: u64) -> bool {
    lock(states)
        .get(pin_id)
        .map_or(false, |s| s.generation == generation)
}

fn lock(states: &PinStates) -> std::sync::MutexGuard<'_, HashMap<Uuid, PinState>> {
    states.lock().unwrap_or_else(PoisonError::into_inner)
}
