use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a photo came from on the photo host. Enough to rebuild its
/// image URL.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhotoSource {
    /// The photo's ID on the host.
    pub remote_id: String,

    pub server: String,

    pub secret: String,

    #[serde(default)]
    pub title: Option<String>,
}

/// A photo belonging to a pin. Without `data` it's a placeholder
/// waiting for its download.
#[derive(Clone, Debug, PartialEq)]
pub struct Photo {
    pub(crate) id: Uuid,

    /// The pin that owns it.
    pub(crate) pin_id: Uuid,

    pub(crate) source: Option<PhotoSource>,

    /// The downloaded image bytes.
    pub(crate) data: Option<Vec<u8>>,
}

impl Photo {
    pub fn new(id: Uuid, pin_id: Uuid, source: Option<PhotoSource>, data: Option<Vec<u8>>) -> Self {
        Photo {
            id,
            pin_id,
            source,
            data,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn pin_id(&self) -> &Uuid {
        &self.pin_id
    }

    pub fn source(&self) -> Option<&PhotoSource> {
        self.source.as_ref()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.data.is_some()
    }

    pub fn summary(&self) -> PhotoSummary {
        PhotoSummary {
            id: self.id,
            pin_id: self.pin_id,
            resolved: self.is_resolved(),
            size: self.data.as_ref().map(Vec::len),
            source: self.source.clone(),
        }
    }
}

/// What clients see of a photo; the bytes are served separately.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PhotoSummary {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub resolved: bool,
    pub size: Option<usize>,
    pub source: Option<PhotoSource>,
}
