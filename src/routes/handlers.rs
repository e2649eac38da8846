use std::time::{Duration, Instant};

use futures::stream::StreamExt;
use log::{debug, info, o, Logger};
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::cache::PhotoLoad;
use crate::environment::Environment;
use crate::errors::TouristError;
use crate::pin::{NewPin, Pin};
use crate::routes::{
    query::RefreshQuery,
    rejection::{Context, Rejection},
    response::{PhotosResponse, SuccessResponse},
};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn pins_list(environment: Environment) -> RouteResult {
    timed! {
        let pins = environment
            .db
            .retrieve_pins()
            .await
            .map_err(|e| Rejection::new(Context::ListPins, e))?;

        json(&SuccessResponse::Pins { pins })
    }
}

pub async fn create_pin(environment: Environment, new_pin: NewPin) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::CreatePin, e);

        let new_pin = validate_pin(new_pin).map_err(error_handler)?;
        let pin = environment.db.insert_pin(new_pin).await.map_err(error_handler)?;
        info!(environment.logger, "Created pin"; "pin" => pin.id().to_string(), "latitude" => pin.latitude(), "longitude" => pin.longitude());

        let location = format!("/pins/{}", pin.id());

        with_header(with_status(json(&pin), StatusCode::CREATED), "location", location)
    }
}

pub async fn retrieve_pin(environment: Environment, id: String) -> RouteResult {
    timed! {
        let pin = find_pin(&environment, &id)
            .await
            .map_err(|e| Rejection::new(Context::RetrievePin { id: id.clone() }, e))?;

        json(&pin)
    }
}

pub async fn delete_pin(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::DeletePin { id: id.clone() }, e);

        let pin_id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Deleting pin..."; "pin" => &id);

        environment.db.delete_pin(&pin_id).await.map_err(error_handler)?;
        environment.cache.forget(&pin_id);

        StatusCode::NO_CONTENT
    }
}

pub async fn load_photos(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::LoadPhotos { pin: id.clone() }, e);

        let pin = find_pin(&environment, &id).await.map_err(error_handler)?;
        let load = environment
            .cache
            .load_photos(&pin)
            .await
            .map_err(error_handler)?;

        reply_with_load(&environment.logger, load)
    }
}

pub async fn refresh_photos(
    environment: Environment,
    id: String,
    query: RefreshQuery,
) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::RefreshPhotos { pin: id.clone() }, e);

        let pin = find_pin(&environment, &id).await.map_err(error_handler)?;
        let load = environment
            .cache
            .refresh_photos(&pin, query.pages)
            .await
            .map_err(error_handler)?;

        reply_with_load(&environment.logger, load)
    }
}

pub async fn retrieve_photo(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::RetrievePhoto { id: id.clone() }, e);

        let photo_id = parse_id(&id).map_err(error_handler)?;
        let photo = environment
            .db
            .retrieve_photo(&photo_id)
            .await
            .and_then(|p| p.ok_or(TouristError::NonExistentId(photo_id)))
            .map_err(error_handler)?;

        json(&photo.summary())
    }
}

pub async fn retrieve_image(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::RetrieveImage { id: id.clone() }, e);

        let photo_id = parse_id(&id).map_err(error_handler)?;
        let photo = environment
            .db
            .retrieve_photo(&photo_id)
            .await
            .and_then(|p| p.ok_or(TouristError::NonExistentId(photo_id)))
            .map_err(error_handler)?;

        let data = photo
            .data
            .ok_or(TouristError::PhotoNotDownloaded(photo_id))
            .map_err(error_handler)?;

        with_header(data, "content-type", mime::IMAGE_JPEG.as_ref())
    }
}

pub async fn delete_photo(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: TouristError| Rejection::new(Context::DeletePhoto { id: id.clone() }, e);

        let photo_id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Deleting photo..."; "photo" => &id);

        environment.db.delete_photo(&photo_id).await.map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

fn validate_pin(pin: NewPin) -> Result<NewPin, TouristError> {
    if pin.is_valid() {
        Ok(pin)
    } else {
        Err(TouristError::InvalidCoordinate {
            latitude: pin.latitude,
            longitude: pin.longitude,
        })
    }
}

fn parse_id(id: &str) -> Result<Uuid, TouristError> {
    Uuid::parse_str(id).map_err(|_| TouristError::InvalidId(id.to_owned()))
}

async fn find_pin(environment: &Environment, id: &str) -> Result<Pin, TouristError> {
    let pin_id = parse_id(id)?;

    environment
        .db
        .retrieve_pin(&pin_id)
        .await?
        .ok_or(TouristError::NonExistentId(pin_id))
}

/// Describes the load and, for a fresh search, follows its downloads in
/// the background so their outcome ends up in the log.
fn reply_with_load(logger: &Logger, load: PhotoLoad) -> warp::reply::Json {
    let response = PhotosResponse::from_load(&load);

    if let PhotoLoad::Fetching(set) = load {
        let logger = logger.new(o!("page" => set.page));

        tokio::spawn(async move {
            let (resolved, failed) = set
                .resolutions
                .fold((0usize, 0usize), |(resolved, failed), r| async move {
                    match r.outcome {
                        Ok(_) => (resolved + 1, failed),
                        Err(_) => (resolved, failed + 1),
                    }
                })
                .await;

            info!(logger, "Photo set downloaded"; "resolved" => resolved, "failed" => failed);
        });
    }

    json(&SuccessResponse::Photos(response))
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
