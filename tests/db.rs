//! Exercises `PgDb` against a real database. Only runs when
//! `TOURIST_TEST_DB_CONNECTION_STRING` is set.

use std::env;
use std::path::Path;

use once_cell::sync::OnceCell;
use uuid::Uuid;

use tourist::db::{Db, PgDb};
use tourist::errors::TouristError;
use tourist::photo::PhotoSource;
use tourist::pin::NewPin;

static MIGRATED: OnceCell<()> = OnceCell::new();

async fn connect() -> Option<PgDb> {
    dotenv::dotenv().ok();

    let connection_string = env::var("TOURIST_TEST_DB_CONNECTION_STRING").ok()?;

    {
        let connection_string = connection_string.clone();
        tokio::task::spawn_blocking(move || {
            MIGRATED.get_or_init(|| initialize_db_for_test(&connection_string))
        })
        .await
        .expect("initialize DB");
    }

    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from TOURIST_TEST_DB_CONNECTION_STRING");

    Some(PgDb::new(pool))
}

fn initialize_db_for_test(connection_string: &str) {
    use movine::Movine;
    use postgres::{Client, NoTls};

    let mut client = Client::connect(connection_string, NoTls)
        .expect("create postgres::Client from TOURIST_TEST_DB_CONNECTION_STRING");
    let mut movine = Movine::new(&mut client);

    let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    movine.set_migration_dir(&migrations.to_string_lossy());
    movine.set_strict(true);

    if movine.status().is_err() {
        movine.initialize().expect("initialize movine");
    }

    movine.up().expect("run movine migrations");
}

fn source(id: &str) -> PhotoSource {
    PhotoSource {
        remote_id: id.to_owned(),
        server: "65535".to_owned(),
        secret: "abcdef".to_owned(),
        title: Some(format!("photo {}", id)),
    }
}

#[tokio::test]
async fn pins_and_photos_round_trip() {
    let db = match connect().await {
        Some(db) => db,
        None => return,
    };

    let mut new_pin = NewPin::new(-33.8568, 151.2153);
    new_pin.title = Some("Opera House".to_owned());

    let pin = db.insert_pin(new_pin).await.unwrap();
    assert_eq!(pin.title(), "Opera House");
    assert_eq!(db.retrieve_pin(pin.id()).await.unwrap(), Some(pin.clone()));
    assert!(db.retrieve_pins().await.unwrap().contains(&pin));

    let mut ids = vec![];
    for id in &["3", "1", "2"] {
        ids.push(*db.insert_photo(pin.id(), source(id)).await.unwrap().id());
    }

    let stored = db.retrieve_photos(pin.id()).await.unwrap();
    assert_eq!(stored.iter().map(|p| *p.id()).collect::<Vec<_>>(), ids);
    assert!(stored.iter().all(|p| !p.is_resolved()));
    assert_eq!(stored[0].source(), Some(&source("3")));

    db.update_photo_data(&ids[1], b"jpeg".to_vec()).await.unwrap();
    let photo = db.retrieve_photo(&ids[1]).await.unwrap().unwrap();
    assert_eq!(photo.data(), Some(&b"jpeg"[..]));

    db.delete_photo(&ids[0]).await.unwrap();
    let mut deleted = db.delete_photos(pin.id()).await.unwrap();
    deleted.sort();
    let mut expected = ids[1..].to_vec();
    expected.sort();
    assert_eq!(deleted, expected);

    db.insert_photo(pin.id(), source("4")).await.unwrap();
    db.delete_pin(pin.id()).await.unwrap();
    assert!(db.retrieve_photos(pin.id()).await.unwrap().is_empty());
    assert_eq!(db.retrieve_pin(pin.id()).await.unwrap(), None);
}

#[tokio::test]
async fn missing_rows_are_reported() {
    let db = match connect().await {
        Some(db) => db,
        None => return,
    };

    let id = Uuid::new_v4();

    assert!(matches!(db.delete_pin(&id).await, Err(TouristError::NonExistentId(x)) if x == id));
    assert!(matches!(
        db.insert_photo(&id, source("1")).await,
        Err(TouristError::NonExistentId(x)) if x == id
    ));
    assert!(matches!(
        db.update_photo_data(&id, vec![]).await,
        Err(TouristError::NonExistentId(..))
    ));
    assert!(matches!(db.delete_photo(&id).await, Err(TouristError::NonExistentId(..))));
}
