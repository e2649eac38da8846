use serde::Serialize;

use crate::cache::PhotoLoad;
use crate::photo::PhotoSummary;
use crate::pin::Pin;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Pins {
        pins: Vec<Pin>,
    },
    Photos(PhotosResponse),
}

/// Where a pin's photo set stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoState {
    /// Served from the store.
    Cached,
    /// Searched for just now; images are still arriving.
    Loading,
    /// There are no photos at this location.
    Empty,
}

#[derive(Debug, Serialize)]
pub struct PhotosResponse {
    pub state: PhotoState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub photos: Vec<PhotoSummary>,
}

impl PhotosResponse {
    /// Describes a load. The resolution stream of a fetch is left to the
    /// caller.
    pub fn from_load(load: &PhotoLoad) -> Self {
        match load {
            PhotoLoad::Cached(photos) => PhotosResponse {
                state: PhotoState::Cached,
                page: None,
                pages: None,
                total: None,
                photos: photos.iter().map(|p| p.summary()).collect(),
            },
            PhotoLoad::NoPhotosAtLocation => PhotosResponse {
                state: PhotoState::Empty,
                page: None,
                pages: None,
                total: Some(0),
                photos: vec![],
            },
            PhotoLoad::Fetching(set) => PhotosResponse {
                state: PhotoState::Loading,
                page: Some(set.page),
                pages: Some(set.pages),
                total: Some(set.total),
                photos: set.placeholders.iter().map(|p| p.summary()).collect(),
            },
        }
    }
}
