use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::TouristError;
use crate::photo::{Photo, PhotoSource};
use crate::pin::{NewPin, Pin};

pub mod memory;

/// Where pins and their photos are kept. Each call is its own atomic
/// write; nothing here spans calls.
pub trait Db {
    fn retrieve_pins(&self) -> BoxFuture<Result<Vec<Pin>, TouristError>>;

    fn retrieve_pin(&self, id: &Uuid) -> BoxFuture<Result<Option<Pin>, TouristError>>;

    fn insert_pin(&self, pin: NewPin) -> BoxFuture<Result<Pin, TouristError>>;

    /// Deletes the pin along with all of its photos.
    fn delete_pin(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>>;

    /// Retrieves a pin's photos in the order they were created.
    fn retrieve_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Photo>, TouristError>>;

    fn retrieve_photo(&self, id: &Uuid) -> BoxFuture<Result<Option<Photo>, TouristError>>;

    /// Creates a placeholder photo for the pin.
    fn insert_photo(
        &self,
        pin_id: &Uuid,
        source: PhotoSource,
    ) -> BoxFuture<Result<Photo, TouristError>>;

    fn update_photo_data(&self, id: &Uuid, data: Vec<u8>) -> BoxFuture<Result<(), TouristError>>;

    fn delete_photo(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>>;

    /// Deletes every photo of the pin, returning the IDs removed.
    fn delete_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, TouristError>>;
}

pub use self::memory::MemoryDb;
pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::TouristError;
    use crate::photo::{Photo, PhotoSource};
    use crate::pin::{NewPin, Pin};

    const PHOTOS_PIN_CONSTRAINT: &str = "photos_pin";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    #[derive(sqlx::FromRow)]
    struct PhotoRow {
        id: Uuid,
        pin_id: Uuid,
        remote_id: Option<String>,
        server: Option<String>,
        secret: Option<String>,
        title: Option<String>,
        data: Option<Vec<u8>>,
    }

    impl From<PhotoRow> for Photo {
        fn from(row: PhotoRow) -> Self {
            let source = match (row.remote_id, row.server, row.secret) {
                (Some(remote_id), Some(server), Some(secret)) => Some(PhotoSource {
                    remote_id,
                    server,
                    secret,
                    title: row.title,
                }),
                _ => None,
            };

            Photo::new(row.id, row.pin_id, source, row.data)
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn retrieve_pins(&self) -> BoxFuture<Result<Vec<Pin>, TouristError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_pins.sql"));

                let pins = query
                    .try_map(|row: PgRow| pin_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(pins)
            }
            .boxed()
        }

        fn retrieve_pin(&self, id: &Uuid) -> BoxFuture<Result<Option<Pin>, TouristError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_pin.sql"));

                let pin = query
                    .bind(id)
                    .try_map(|row: PgRow| pin_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(pin)
            }
            .boxed()
        }

        fn insert_pin(&self, pin: NewPin) -> BoxFuture<Result<Pin, TouristError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_pin.sql"));

                let id = Uuid::new_v4();
                let title = pin.title_or_default();

                let (created_at,): (OffsetDateTime,) = query
                    .bind(id)
                    .bind(pin.latitude)
                    .bind(pin.longitude)
                    .bind(&title)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Pin::new(id, pin.latitude, pin.longitude, title, created_at))
            }
            .boxed()
        }

        fn delete_pin(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_pin.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(TouristError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn retrieve_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Photo>, TouristError>> {
            let pin_id = *pin_id;

            async move {
                let query =
                    sqlx::query_as::<_, PhotoRow>(include_str!("queries/retrieve_photos.sql"));

                let rows = query
                    .bind(pin_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows.into_iter().map(Photo::from).collect())
            }
            .boxed()
        }

        fn retrieve_photo(&self, id: &Uuid) -> BoxFuture<Result<Option<Photo>, TouristError>> {
            let id = *id;

            async move {
                let query =
                    sqlx::query_as::<_, PhotoRow>(include_str!("queries/retrieve_photo.sql"));

                let row = query
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(row.map(Photo::from))
            }
            .boxed()
        }

        fn insert_photo(
            &self,
            pin_id: &Uuid,
            source: PhotoSource,
        ) -> BoxFuture<Result<Photo, TouristError>> {
            let pin_id = *pin_id;

            async move {
                let query = sqlx::query(include_str!("queries/create_photo.sql"));

                let id = Uuid::new_v4();

                query
                    .bind(id)
                    .bind(pin_id)
                    .bind(&source.remote_id)
                    .bind(&source.server)
                    .bind(&source.secret)
                    .bind(&source.title)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| match e {
                        sqlx::Error::Database(ref d)
                            if d.constraint() == Some(PHOTOS_PIN_CONSTRAINT) =>
                        {
                            TouristError::NonExistentId(pin_id)
                        }
                        e => map_sqlx_error(e),
                    })?;

                Ok(Photo::new(id, pin_id, Some(source), None))
            }
            .boxed()
        }

        fn update_photo_data(
            &self,
            id: &Uuid,
            data: Vec<u8>,
        ) -> BoxFuture<Result<(), TouristError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/update_photo_data.sql"));

                let count = query
                    .bind(id)
                    .bind(data)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(TouristError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_photo(&self, id: &Uuid) -> BoxFuture<Result<(), TouristError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_photo.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(TouristError::NonExistentId(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_photos(&self, pin_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, TouristError>> {
            let pin_id = *pin_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/delete_photos.sql"));

                let ids: Vec<(Uuid,)> = query
                    .bind(pin_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(ids.into_iter().map(|(id,)| id).collect())
            }
            .boxed()
        }
    }

    fn pin_from_row(row: &PgRow) -> Result<Pin, sqlx::Error> {
        use sqlx::prelude::*;

        Ok(Pin::new(
            row.try_get("id")?,
            row.try_get("latitude")?,
            row.try_get("longitude")?,
            row.try_get("title")?,
            row.try_get("created_at")?,
        ))
    }

    fn map_sqlx_error(error: sqlx::Error) -> TouristError {
        TouristError::Sqlx { source: error }
    }
}
