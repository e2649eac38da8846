use serde::{Deserialize, Deserializer, Serialize};

use crate::photo::PhotoSource;

/// A successful `flickr.photos.search` reply.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchResponse {
    pub photos: PhotoSearchPage,
    pub stat: String,
}

/// Just enough of any reply to tell success from failure.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub(crate) stat: String,
    #[serde(default)]
    pub(crate) code: Option<i64>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// One page of search results.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhotoSearchPage {
    /// The number of this page, starting at 1.
    pub page: u32,

    /// How many pages the whole result set spans.
    pub pages: u32,

    pub perpage: u32,

    /// The size of the whole result set. The API sends this as a
    /// string; see [`PhotoSearchPage::total_photos`].
    #[serde(deserialize_with = "string_or_number")]
    pub total: String,

    pub photo: Vec<PhotoMetadata>,
}

impl PhotoSearchPage {
    pub fn total_photos(&self) -> Result<u64, std::num::ParseIntError> {
        self.total.trim().parse()
    }
}

/// A single search result.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhotoMetadata {
    pub id: String,
    pub owner: String,
    pub secret: String,
    pub server: String,
    pub farm: i64,
    pub title: String,
    pub ispublic: i64,
    pub isfriend: i64,
    pub isfamily: i64,
}

impl PhotoMetadata {
    pub fn source(&self) -> PhotoSource {
        PhotoSource {
            remote_id: self.id.clone(),
            server: self.server.clone(),
            secret: self.secret.clone(),
            title: if self.title.is_empty() {
                None
            } else {
                Some(self.title.clone())
            },
        }
    }
}

// some API versions send `total` as a bare number
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        String(String),
        Number(u64),
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::String(s) => s,
        Total::Number(n) => n.to_string(),
    })
}
