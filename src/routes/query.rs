use serde::Deserialize;

/// Query for `POST /pins/{id}/photos/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    /// The page count the client last saw for this pin.
    #[serde(default)]
    pub pages: Option<u32>,
}
