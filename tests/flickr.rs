use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures::stream::StreamExt;
use serde_json::json;
use url::Url;
use warp::http::StatusCode;
use warp::Filter;

use tourist::cache::{CacheSettings, PhotoCache, PhotoLoad};
use tourist::db::{Db, MemoryDb};
use tourist::errors::{RemoteError, TouristError};
use tourist::flickr::{FlickrClient, FlickrConfig, PhotoApi, SizeTag};
use tourist::geo::Precision;
use tourist::pin::NewPin;

const GOOD_KEY: &str = "good";
const FAILING_KEY: &str = "rejected";
const BROKEN_KEY: &str = "broken";
const GARBAGE_KEY: &str = "garbage";
const MISSING_ID: &str = "404";

type Queries = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Serves a tiny imitation of the photo host on an ephemeral port.
/// Searches always find photos `101` and the missing one; images are
/// served as their own file names.
fn start_host() -> (SocketAddr, Queries) {
    let queries: Queries = Arc::new(Mutex::new(vec![]));
    let recorded = queries.clone();

    let search = warp::path!("services" / "rest")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .map(move |query: HashMap<String, String>| {
            recorded.lock().unwrap().push(query.clone());

            let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

            let reply: Box<dyn warp::Reply> = match query.get("api_key").map(String::as_str) {
                Some(GOOD_KEY) => Box::new(warp::reply::json(&json!({
                    "photos": {
                        "page": page,
                        "pages": 2,
                        "perpage": 30,
                        "total": "32",
                        "photo": [
                            photo("101", "first"),
                            photo(MISSING_ID, "second"),
                        ],
                    },
                    "stat": "ok",
                }))),
                Some(BROKEN_KEY) => Box::new(StatusCode::INTERNAL_SERVER_ERROR),
                Some(GARBAGE_KEY) => Box::new("this is not json"),
                _ => Box::new(warp::reply::json(&json!({
                    "stat": "fail",
                    "code": 100,
                    "message": "Invalid API Key (Key has invalid format)",
                }))),
            };

            reply
        });

    let images = warp::path!("img" / String / String)
        .and(warp::get())
        .map(|server: String, file: String| {
            let reply: Box<dyn warp::Reply> = if file.starts_with(MISSING_ID) {
                Box::new(StatusCode::NOT_FOUND)
            } else {
                Box::new(format!("{}/{}", server, file).into_bytes())
            };

            reply
        });

    let (address, server) = warp::serve(search.or(images)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    (address, queries)
}

fn photo(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "owner": "12345@N00",
        "secret": "abcdef",
        "server": "65535",
        "farm": 66,
        "title": title,
        "ispublic": 1,
        "isfriend": 0,
        "isfamily": 0,
    })
}

fn client(address: SocketAddr, api_key: &str) -> FlickrClient {
    let search_url = Url::parse(&format!("http://{}/services/rest/", address)).unwrap();
    let photo_url = Url::parse(&format!("http://{}/img/", address)).unwrap();

    FlickrClient::new(FlickrConfig::new(api_key).with_urls(search_url, photo_url))
}

#[tokio::test]
async fn search_sends_every_parameter() {
    let (address, queries) = start_host();
    let client = client(address, GOOD_KEY);

    let page = client
        .search(50.0, 33.0, Precision::TenKilometer, 3)
        .await
        .unwrap();

    assert_eq!(page.page, 3);
    assert_eq!(page.pages, 2);
    assert_eq!(page.total_photos().unwrap(), 32);
    assert_eq!(page.photo.len(), 2);

    let queries = queries.lock().unwrap();
    let query = &queries[0];

    let expected = [
        ("method", "flickr.photos.search"),
        ("api_key", GOOD_KEY),
        ("bbox", "32.9,49.9,33.1,50.1"),
        ("lat", "50"),
        ("lon", "33"),
        ("sort", "date-posted-desc"),
        ("per_page", "30"),
        ("page", "3"),
        ("format", "json"),
        ("nojsoncallback", "1"),
    ];

    for (key, value) in &expected {
        assert_eq!(query.get(*key).map(String::as_str), Some(*value), "{}", key);
    }
}

#[tokio::test]
async fn search_failures_are_reported() {
    let (address, _) = start_host();

    let result = client(address, FAILING_KEY)
        .search(1.0, 1.0, Precision::Kilometer, 1)
        .await;
    assert!(matches!(
        result,
        Err(TouristError::SearchFailed { source: RemoteError::Api { code: 100, .. } })
    ));

    let result = client(address, BROKEN_KEY)
        .search(1.0, 1.0, Precision::Kilometer, 1)
        .await;
    assert!(matches!(
        result,
        Err(TouristError::SearchFailed { source: RemoteError::Status(s) }) if s.as_u16() == 500
    ));

    let result = client(address, GARBAGE_KEY)
        .search(1.0, 1.0, Precision::Kilometer, 1)
        .await;
    assert!(matches!(
        result,
        Err(TouristError::SearchFailed { source: RemoteError::Decode(..) })
    ));
}

#[tokio::test]
async fn images_are_fetched_by_size() {
    let (address, _) = start_host();
    let client = client(address, GOOD_KEY);

    let page = client.search(1.0, 1.0, Precision::Kilometer, 1).await.unwrap();
    let source = page.photo[0].source();

    let bytes = client
        .fetch_image_bytes(&source, SizeTag::Thumbnail)
        .await
        .unwrap();
    assert_eq!(bytes, b"65535/101_abcdef_q.jpg".to_vec());

    let missing = page.photo[1].source();
    let result = client.fetch_image_bytes(&missing, SizeTag::Large).await;
    assert!(matches!(
        result,
        Err(TouristError::DownloadFailed { source: RemoteError::Status(s) }) if s.as_u16() == 404
    ));
}

#[tokio::test]
async fn photo_sets_are_downloaded_into_the_store() {
    let (address, queries) = start_host();

    let logger = Arc::new(log::discard());
    let db: Arc<dyn Db + Send + Sync> = Arc::new(MemoryDb::new());
    let cache = PhotoCache::new(
        logger,
        db.clone(),
        Arc::new(client(address, GOOD_KEY)),
        CacheSettings {
            precision: Precision::Kilometer,
            size: SizeTag::Medium,
        },
    );

    let pin = db.insert_pin(NewPin::new(50.0, 33.0)).await.unwrap();

    let set = match cache.load_photos(&pin).await.unwrap() {
        PhotoLoad::Fetching(set) => set,
        other => panic!("expected a search, got {:?}", other),
    };

    assert_eq!(set.page, 1);
    assert_eq!(set.total, 32);
    assert_eq!(set.placeholders.len(), 2);

    let resolutions = set.resolutions.collect::<Vec<_>>().await;
    assert_eq!(resolutions.len(), 2);

    let first = set.placeholders[0].id();
    let second = set.placeholders[1].id();

    let stored = db.retrieve_photo(first).await.unwrap().unwrap();
    assert_eq!(stored.data(), Some(&b"65535/101_abcdef_c.jpg"[..]));

    let placeholder = db.retrieve_photo(second).await.unwrap().unwrap();
    assert!(!placeholder.is_resolved());
    assert!(resolutions
        .iter()
        .any(|r| r.photo_id == *second && matches!(r.outcome, Err(TouristError::DownloadFailed { .. }))));

    match cache.load_photos(&pin).await.unwrap() {
        PhotoLoad::Cached(photos) => assert_eq!(photos.len(), 2),
        other => panic!("expected the stored photos, got {:?}", other),
    }

    assert_eq!(queries.lock().unwrap().len(), 1);
}
