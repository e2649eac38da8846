use std::sync::Arc;

use log::{error, warn, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::TouristError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;
pub use response::PhotoState;

/// The largest pin submission we accept.
const MAX_CONTENT_LENGTH: u64 = 16 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);

        if status.is_server_error() {
            error!(logger, "Request failed"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        } else {
            warn!(logger, "Request rejected"; "context" => ?r.context, "status" => %status, "message" => %r.error);
        }

        return Ok(with_status(json(&r.flatten()), status));
    }

    Err(rej)
}

fn status_code_for(e: &TouristError) -> StatusCode {
    use TouristError::*;

    match e {
        InvalidId(..) | InvalidCoordinate { .. } | BadRequest(..) => StatusCode::BAD_REQUEST,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        PhotoNotDownloaded(..) | StalePhotoSet { .. } => StatusCode::CONFLICT,
        SearchFailed { .. } | DownloadFailed { .. } => StatusCode::BAD_GATEWAY,
        Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{body, delete, get as g, path as p, path::param as par, post, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::pin::NewPin;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
        ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
        ($route_variable:ident; $first:expr, $($rest:expr),+) => (
            let $route_variable = $route_variable.and($first);
            route_filter!($route_variable; $($rest),+);
        )
    }

    macro_rules! route {
        ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
            pub fn $name(environment: Environment) -> Route {
                let $route_variable = warp::any().map(move || environment.clone());

                route_filter!($route_variable; $($filters),+);

                $route_variable.and_then(handlers::$handler)
                    .boxed()
            }
        );
    }

    route!(make_pins_list_route => pins_list, rt; p("pins"), end(), g());
    route!(make_create_pin_route => create_pin, rt; p("pins"), end(), post(), body::content_length_limit(MAX_CONTENT_LENGTH), body::json::<NewPin>());
    route!(make_retrieve_pin_route => retrieve_pin, rt; p("pins"), par::<String>(), end(), g());
    route!(make_delete_pin_route => delete_pin, rt; p("pins"), par::<String>(), end(), delete());
    route!(make_photos_route => load_photos, rt; p("pins"), par::<String>(), p("photos"), end(), g());
    route!(make_refresh_route => refresh_photos, rt; p("pins"), par::<String>(), p("photos"), p("refresh"), end(), post(), query::<q::RefreshQuery>());
    route!(make_retrieve_photo_route => retrieve_photo, rt; p("photos"), par::<String>(), end(), g());
    route!(make_image_route => retrieve_image, rt; p("photos"), par::<String>(), p("image"), end(), g());
    route!(make_delete_photo_route => delete_photo, rt; p("photos"), par::<String>(), end(), delete());

    /// Every public route, combined.
    pub fn make_api(environment: Environment) -> Route {
        make_pins_list_route(environment.clone())
            .or(make_create_pin_route(environment.clone()))
            .unify()
            .or(make_retrieve_pin_route(environment.clone()))
            .unify()
            .or(make_delete_pin_route(environment.clone()))
            .unify()
            .or(make_photos_route(environment.clone()))
            .unify()
            .or(make_refresh_route(environment.clone()))
            .unify()
            .or(make_retrieve_photo_route(environment.clone()))
            .unify()
            .or(make_image_route(environment.clone()))
            .unify()
            .or(make_delete_photo_route(environment))
            .unify()
            .boxed()
    }
}
