use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A marker placed on the map. Pins are looked up by `id`, never by
/// comparing coordinates.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Pin {
    /// The ID of the pin.
    pub(crate) id: Uuid,

    pub(crate) latitude: f64,

    pub(crate) longitude: f64,

    /// The title shown next to the pin.
    pub(crate) title: String,

    /// The date and time it was placed.
    #[serde(with = "time::serde::timestamp")]
    pub(crate) created_at: OffsetDateTime,
}

impl Pin {
    pub fn new(
        id: Uuid,
        latitude: f64,
        longitude: f64,
        title: String,
        created_at: OffsetDateTime,
    ) -> Self {
        Pin {
            id,
            latitude,
            longitude,
            title,
            created_at,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// A pin as submitted, before it has an ID.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewPin {
    pub latitude: f64,

    pub longitude: f64,

    /// Defaults to the formatted coordinate when omitted.
    #[serde(default)]
    pub title: Option<String>,
}

impl NewPin {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        NewPin {
            latitude,
            longitude,
            title: None,
        }
    }

    pub fn title_or_default(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.trim().to_owned(),
            _ => format!("{:.4}, {:.4}", self.latitude, self.longitude),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
