use thiserror::Error;
use uuid::Uuid;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum TouristError {
    /// Represents a transport or decoding failure while searching for
    /// photos.
    #[error("Photo search failed: {source}")]
    SearchFailed { source: RemoteError },

    /// Represents a transport failure while downloading an image.
    #[error("Photo download failed: {source}")]
    DownloadFailed { source: RemoteError },

    /// Represents a coordinate that can't be turned into a bounding box.
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Represents an ID that couldn't be parsed.
    #[error("Invalid ID {0:?}")]
    InvalidId(String),

    /// Represents a request for an object that doesn't exist.
    #[error("Non-existent ID {0}")]
    NonExistentId(Uuid),

    /// Represents a request for the image of a placeholder photo.
    #[error("Photo {0} has not been downloaded yet")]
    PhotoNotDownloaded(Uuid),

    /// Represents a download that finished after its photo set was
    /// replaced.
    #[error("Photo set for pin {pin_id} was replaced (generation {generation})")]
    StalePhotoSet { pin_id: Uuid, generation: u64 },

    /// Represents an error with the request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },
}

/// The underlying cause of a failed call to the photo host.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// No response could be obtained.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// The response body didn't have the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The API reported a failure in its own envelope.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// An image URL couldn't be built from the photo's metadata.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[source] url::ParseError),

    /// The reported photo total wasn't a number.
    #[error("unparseable photo total {0:?}")]
    InvalidTotal(String),
}
