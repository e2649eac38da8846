use serde::Serialize;
use warp::reject;

use crate::errors::TouristError;

/// A handler failure, along with what the handler was doing.
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: TouristError,
}

impl Rejection {
    pub fn new(context: Context, error: TouristError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Context {
    ListPins,
    CreatePin,
    RetrievePin { id: String },
    DeletePin { id: String },
    LoadPhotos { pin: String },
    RefreshPhotos { pin: String },
    RetrievePhoto { id: String },
    RetrieveImage { id: String },
    DeletePhoto { id: String },
}
