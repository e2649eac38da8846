use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};

use super::{PhotoApi, PhotoMetadata, PhotoSearchPage, SizeTag, PER_PAGE};
use crate::errors::{RemoteError, TouristError};
use crate::geo::Precision;
use crate::photo::PhotoSource;

/// A scripted photo host. Every page holds the same photos, with the
/// page number folded into their IDs.
#[derive(Default)]
pub(crate) struct MockApi {
    pub(crate) pages: u32,
    pub(crate) total: String,
    pub(crate) per_page: usize,
    pub(crate) delays: HashMap<String, Duration>,
    pub(crate) failing: HashSet<String>,
    pub(crate) search_fails: bool,
    pub(crate) searches: Mutex<Vec<u32>>,
    pub(crate) downloads: Mutex<Vec<String>>,
}

impl MockApi {
    pub(crate) fn new(pages: u32, per_page: usize) -> Self {
        MockApi {
            pages,
            total: (pages as usize * per_page).to_string(),
            per_page,
            ..Default::default()
        }
    }

    pub(crate) fn empty() -> Self {
        MockApi {
            total: "0".to_owned(),
            ..Default::default()
        }
    }

    pub(crate) fn searches(&self) -> Vec<u32> {
        self.searches.lock().unwrap().clone()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

pub(crate) fn remote_id(page: u32, index: usize) -> String {
    format!("{}-{}", page, index)
}

pub(crate) fn image_for(remote_id: &str) -> Vec<u8> {
    format!("image:{}", remote_id).into_bytes()
}

impl PhotoApi for MockApi {
    fn search(
        &self,
        _latitude: f64,
        _longitude: f64,
        _precision: Precision,
        page: u32,
    ) -> BoxFuture<Result<PhotoSearchPage, TouristError>> {
        async move {
            self.searches.lock().unwrap().push(page);

            if self.search_fails {
                return Err(TouristError::SearchFailed {
                    source: RemoteError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE),
                });
            }

            let photo = (0..self.per_page)
                .map(|i| PhotoMetadata {
                    id: remote_id(page, i),
                    owner: "owner".to_owned(),
                    secret: "secret".to_owned(),
                    server: "1".to_owned(),
                    farm: 1,
                    title: String::new(),
                    ispublic: 1,
                    isfriend: 0,
                    isfamily: 0,
                })
                .collect();

            Ok(PhotoSearchPage {
                page,
                pages: self.pages,
                perpage: PER_PAGE,
                total: self.total.clone(),
                photo,
            })
        }
        .boxed()
    }

    fn fetch_image_bytes(
        &self,
        source: &PhotoSource,
        _size: SizeTag,
    ) -> BoxFuture<Result<Vec<u8>, TouristError>> {
        let remote_id = source.remote_id.clone();

        async move {
            if let Some(delay) = self.delays.get(&remote_id) {
                tokio::time::sleep(*delay).await;
            }

            self.downloads.lock().unwrap().push(remote_id.clone());

            if self.failing.contains(&remote_id) {
                return Err(TouristError::DownloadFailed {
                    source: RemoteError::Status(reqwest::StatusCode::NOT_FOUND),
                });
            }

            Ok(image_for(&remote_id))
        }
        .boxed()
    }
}
