use std::fmt;
use std::str::FromStr;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{RemoteError, TouristError};
use crate::geo::{BoundingBox, Precision};
use crate::photo::PhotoSource;

#[cfg(test)]
pub(crate) mod mock;
pub mod response;

pub use response::{PhotoMetadata, PhotoSearchPage, SearchResponse};

pub const DEFAULT_SEARCH_URL: &str = "https://www.flickr.com/services/rest/";
pub const DEFAULT_PHOTO_URL: &str = "https://live.staticflickr.com/";

/// Results per page. Fixed; the page cap in the cache depends on it.
pub const PER_PAGE: u32 = 30;

const SEARCH_METHOD: &str = "flickr.photos.search";
const SORT_ORDER: &str = "date-posted-desc";

/// The image sizes we ask the photo host for.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTag {
    /// 150px square.
    Thumbnail,
    /// 400px on the longest side.
    Small,
    /// 800px.
    Medium,
    /// 1024px.
    Large,
}

impl SizeTag {
    pub const ALL: [SizeTag; 4] = [
        SizeTag::Thumbnail,
        SizeTag::Small,
        SizeTag::Medium,
        SizeTag::Large,
    ];

    /// The suffix used in image URLs.
    pub fn code(self) -> &'static str {
        match self {
            SizeTag::Thumbnail => "q",
            SizeTag::Small => "w",
            SizeTag::Medium => "c",
            SizeTag::Large => "b",
        }
    }

    fn name(self) -> &'static str {
        match self {
            SizeTag::Thumbnail => "thumbnail",
            SizeTag::Small => "small",
            SizeTag::Medium => "medium",
            SizeTag::Large => "large",
        }
    }
}

impl Default for SizeTag {
    fn default() -> Self {
        SizeTag::Large
    }
}

impl fmt::Display for SizeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SizeTag {
    type Err = TouristError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeTag::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| TouristError::BadRequest(format!("unknown size tag {:?}", s)))
    }
}

/// A remote photo search service.
pub trait PhotoApi: Send + Sync {
    /// Retrieves one page of photos around the coordinate. Never
    /// retries.
    fn search(
        &self,
        latitude: f64,
        longitude: f64,
        precision: Precision,
        page: u32,
    ) -> BoxFuture<Result<PhotoSearchPage, TouristError>>;

    /// Downloads the image for a search result. Never retries.
    fn fetch_image_bytes(
        &self,
        source: &PhotoSource,
        size: SizeTag,
    ) -> BoxFuture<Result<Vec<u8>, TouristError>>;
}

/// Where and as whom to talk to the photo host.
#[derive(Clone, Debug)]
pub struct FlickrConfig {
    pub api_key: String,

    /// The REST endpoint, including trailing slash.
    pub search_url: Url,

    /// The static image host, including trailing slash.
    pub photo_url: Url,
}

impl FlickrConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        FlickrConfig {
            api_key: api_key.into(),
            search_url: Url::parse(DEFAULT_SEARCH_URL).expect("parse default search URL"),
            photo_url: Url::parse(DEFAULT_PHOTO_URL).expect("parse default photo URL"),
        }
    }

    pub fn with_urls(mut self, search_url: Url, photo_url: Url) -> Self {
        self.search_url = search_url;
        self.photo_url = photo_url;
        self
    }
}

/// Talks to Flickr over HTTP.
pub struct FlickrClient {
    client: reqwest::Client,
    config: FlickrConfig,
}

impl FlickrClient {
    pub fn new(config: FlickrConfig) -> Self {
        FlickrClient {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Builds the URL for one page of search results.
    pub fn search_url(
        &self,
        latitude: f64,
        longitude: f64,
        precision: Precision,
        page: u32,
    ) -> Result<Url, TouristError> {
        let bbox = BoundingBox::new(latitude, longitude, precision)?;

        let mut url = self.config.search_url.clone();
        url.query_pairs_mut()
            .append_pair("method", SEARCH_METHOD)
            .append_pair("api_key", &self.config.api_key)
            .append_pair("bbox", &bbox.to_string())
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string())
            .append_pair("sort", SORT_ORDER)
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("format", "json")
            .append_pair("nojsoncallback", "1");

        Ok(url)
    }

    /// Builds the direct image URL: `<host>/<server>/<id>_<secret>_<size>.jpg`.
    pub fn image_url(&self, source: &PhotoSource, size: SizeTag) -> Result<Url, RemoteError> {
        let path = format!(
            "{}/{}_{}_{}.jpg",
            source.server,
            source.remote_id,
            source.secret,
            size.code()
        );

        self.config
            .photo_url
            .join(&path)
            .map_err(RemoteError::InvalidUrl)
    }
}

impl PhotoApi for FlickrClient {
    fn search(
        &self,
        latitude: f64,
        longitude: f64,
        precision: Precision,
        page: u32,
    ) -> BoxFuture<Result<PhotoSearchPage, TouristError>> {
        let url = self.search_url(latitude, longitude, precision, page);

        async move {
            let body = get(&self.client, url?)
                .await
                .map_err(|source| TouristError::SearchFailed { source })?;

            decode_search(&body).map_err(|source| TouristError::SearchFailed { source })
        }
        .boxed()
    }

    fn fetch_image_bytes(
        &self,
        source: &PhotoSource,
        size: SizeTag,
    ) -> BoxFuture<Result<Vec<u8>, TouristError>> {
        let url = self.image_url(source, size);

        async move {
            let url = url.map_err(|source| TouristError::DownloadFailed { source })?;

            get(&self.client, url)
                .await
                .map_err(|source| TouristError::DownloadFailed { source })
        }
        .boxed()
    }
}

async fn get(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, RemoteError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(RemoteError::Transport)?;

    let status = response.status();

    if !status.is_success() {
        return Err(RemoteError::Status(status));
    }

    let body = response.bytes().await.map_err(RemoteError::Transport)?;

    Ok(body.to_vec())
}

/// Decodes a search reply, turning the API's own failure envelope into
/// an error.
pub(crate) fn decode_search(body: &[u8]) -> Result<PhotoSearchPage, RemoteError> {
    let envelope: response::Envelope = serde_json::from_slice(body).map_err(RemoteError::Decode)?;

    if envelope.stat != "ok" {
        return Err(RemoteError::Api {
            code: envelope.code.unwrap_or_default(),
            message: envelope.message.unwrap_or(envelope.stat),
        });
    }

    let response: SearchResponse = serde_json::from_slice(body).map_err(RemoteError::Decode)?;

    Ok(response.photos)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use url::Url;

    use super::{decode_search, FlickrClient, FlickrConfig, SizeTag};
    use crate::errors::RemoteError;
    use crate::geo::Precision;
    use crate::photo::PhotoSource;

    fn client() -> FlickrClient {
        FlickrClient::new(FlickrConfig::new("secret-key"))
    }

    #[test]
    fn search_url_has_every_parameter() {
        let url = client()
            .search_url(50.0, 33.0, Precision::TenKilometer, 7)
            .unwrap();

        assert_eq!(url.host_str(), Some("www.flickr.com"));
        assert_eq!(url.path(), "/services/rest/");
        assert!(url.as_str().contains("bbox=32.9%2C49.9%2C33.1%2C50.1"));

        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        let expected = [
            ("method", "flickr.photos.search"),
            ("api_key", "secret-key"),
            ("bbox", "32.9,49.9,33.1,50.1"),
            ("lat", "50"),
            ("lon", "33"),
            ("sort", "date-posted-desc"),
            ("per_page", "30"),
            ("page", "7"),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ];

        assert_eq!(query.len(), expected.len());

        for (key, value) in expected.iter() {
            assert_eq!(query.get(*key).map(String::as_str), Some(*value), "{}", key);
        }
    }

    #[test]
    fn image_url_has_no_key() {
        let source = PhotoSource {
            remote_id: "5100".to_owned(),
            server: "65535".to_owned(),
            secret: "abc".to_owned(),
            title: None,
        };

        let codes = SizeTag::ALL
            .iter()
            .map(|s| client().image_url(&source, *s).unwrap().to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            codes,
            vec![
                "https://live.staticflickr.com/65535/5100_abc_q.jpg",
                "https://live.staticflickr.com/65535/5100_abc_w.jpg",
                "https://live.staticflickr.com/65535/5100_abc_c.jpg",
                "https://live.staticflickr.com/65535/5100_abc_b.jpg",
            ]
        );
    }

    #[test]
    fn custom_hosts_are_used() {
        let config = FlickrConfig::new("k").with_urls(
            Url::parse("http://127.0.0.1:9000/rest/").unwrap(),
            Url::parse("http://127.0.0.1:9000/img/").unwrap(),
        );
        let client = FlickrClient::new(config);

        let url = client.search_url(1.0, 2.0, Precision::Meter, 1).unwrap();
        assert_eq!(url.path(), "/rest/");
    }

    #[test]
    fn search_rejects_bad_coordinates() {
        assert!(client()
            .search_url(f64::NAN, 0.0, Precision::Kilometer, 1)
            .is_err());
    }

    #[test]
    fn api_failures_are_errors() {
        let body = br#"{"stat": "fail", "code": 100, "message": "Invalid API Key"}"#;

        match decode_search(body) {
            Err(RemoteError::Api { code, message }) => {
                assert_eq!(code, 100);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_search(b"<html>"), Err(RemoteError::Decode(..))));
        assert!(matches!(
            decode_search(br#"{"stat": "ok"}"#),
            Err(RemoteError::Decode(..))
        ));
    }

    #[test]
    fn size_tags_parse() {
        assert_eq!("medium".parse::<SizeTag>().unwrap(), SizeTag::Medium);
        assert_eq!(SizeTag::default(), SizeTag::Large);
        assert!("huge".parse::<SizeTag>().is_err());
    }
}
