use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{self, BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Db;
use crate::errors::TouristError;
use crate::photo::{Photo, PhotoSource};
use crate::pin::{NewPin, Pin};

/// Keeps everything in process memory. Used when no database is
/// configured, and by the tests.
#[derive(Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    pins: Vec<Pin>,
    photos: Vec<Photo>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_pin(&self, id: Uuid) -> Result<(), TouristError> {
        let mut tables = self.write();
        let before = tables.pins.len();

        tables.pins.retain(|p| p.id != id);

        if tables.pins.len() == before {
            return Err(TouristError::NonExistentId(id));
        }

        tables.photos.retain(|p| p.pin_id != id);

        Ok(())
    }

    fn add_photo(&self, pin_id: Uuid, source: PhotoSource) -> Result<Photo, TouristError> {
        let mut tables = self.write();

        if !tables.pins.iter().any(|p| p.id == pin_id) {
            return Err(TouristError::NonExistentId(pin_id));
        }

        let photo = Photo::new(Uuid::new_v4(), pin_id, Some(source), None);
        tables.photos.push(photo.clone());

        Ok(photo)
    }

    fn set_photo_data(&self, id: Uuid, data: Vec<u8>) -> Result<(), TouristError> {
        let mut tables = self.write();

        let photo = tables
            .photos
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(TouristError::NonExistentId(id))?;

        photo.data = Some(data);

        Ok(())
    }

    fn remove_photo(&self, id: Uuid) -> Result<(), TouristError> {
        let mut tables = self.write();
        let before = tables.photos.len();

        tables.photos.retain(|p| p.id != id);

        if tables.photos.len() == before {
            Err(TouristError::NonExistentId(id))
        } else {
            Ok(())
        }
    }

    fn remove_photos(&self, pin_id: Uuid) -> Vec<Uuid> {
        let mut tables = self.write();

        let (removed, kept): (Vec<Photo>, Vec<Photo>) = tables
            .photos
            .drain(..)
            .partition(|p| p.pin_id == pin_id);

        tables.photos = kept;

        removed.into_iter().map(|p| p.id).collect()
    }
}

impl Db for MemoryDb {
    fn retrieve_pins(&self) -> BoxFuture<Result<Vec<Pin>, TouristError>> {
        future::ready(Ok(self.read().pins.clone())).boxed()
    }

    fn retrieve_pin(&self, id: &Uuid) -> BoxFuture<Result<Option<Pin>, TouristError>> {
        let pin = self.read().pins.iter().find(|p| p.id == *id).cloned();

        future::ready(Ok(pin)).boxed()
    }

    fn insert_pin(&self, pin: NewPin) -> BoxFuture<Result<Pin, TouristError>> {
        let pin = Pin::new(
            Uuid::new_v4(),
            pin.latitude,
            pin.longitude,
            pin.title_or_default(),
            OffsetDateTime::now_utc(),
        );

        self.write().pins.push(pin.clone());

        future::ready(Ok(pin)).boxed()
    }

    fn delete_pin(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>> {
        future::ready(self.remove_pin(*id)).boxed()
    }

    fn retrieve_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Photo>, TouristError>> {
        let photos = self
            .read()
            .photos
            .iter()
            .filter(|p| p.pin_id == *pin_id)
            .cloned()
            .collect();

        future::ready(Ok(photos)).boxed()
    }

    fn retrieve_photo(&self, id: &Uuid) -> BoxFuture<Result<Option<Photo>, TouristError>> {
        let photo = self.read().photos.iter().find(|p| p.id == *id).cloned();

        future::ready(Ok(photo)).boxed()
    }

    fn insert_photo(
        &self,
        pin_id: &Uuid,
        source: PhotoSource,
    ) -> BoxFuture<Result<Photo, TouristError>> {
        future::ready(self.add_photo(*pin_id, source)).boxed()
    }

    fn update_photo_data(&self, id: &Uuid, data: Vec<u8>) -> BoxFuture<Result<(), TouristError>> {
        future::ready(self.set_photo_data(*id, data)).boxed()
    }

    fn delete_photo(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>> {
        future::ready(self.remove_photo(*id)).boxed()
    }

    fn delete_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, TouristError>> {
        future::ready(Ok(self.remove_photos(*pin_id))).boxed()
    }
}
