use std::error::Error;
use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use log::{info, initialize_logger, warn};
use tourist::cache::PhotoCache;
use tourist::config::{
    cache_settings_from_env, flickr_from_env, get_optional_variable, parse_variable,
};
use tourist::db::{Db, MemoryDb, PgDb};
use tourist::environment::Environment;
use tourist::flickr::FlickrClient;
use tourist::routes;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ADMIN_PORT: u16 = 8081;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    // routes warp's own records through RUST_LOG
    #[cfg(feature = "env_logging")]
    let _scope_guard = log::initialize_env_logger();

    let logger = initialize_logger();

    let main_port: u16 = parse_variable("TOURIST_PORT", DEFAULT_PORT);
    let admin_port: u16 = parse_variable("TOURIST_ADMIN_PORT", DEFAULT_ADMIN_PORT);

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    let db: Arc<dyn Db + Send + Sync> = match get_optional_variable("TOURIST_DB_CONNECTION_STRING") {
        Some(connection_string) => {
            info!(logger, "Creating database pool...");
            let pool = sqlx::Pool::connect(&connection_string).await?;
            Arc::new(PgDb::new(pool))
        }
        None => {
            warn!(logger, "No database configured, keeping pins in memory");
            Arc::new(MemoryDb::new())
        }
    };

    let api = Arc::new(FlickrClient::new(flickr_from_env()));
    let cache = Arc::new(PhotoCache::new(
        logger.clone(),
        db.clone(),
        api,
        cache_settings_from_env(),
    ));

    let settings = cache.settings();
    info!(logger, "Photo settings"; "precision" => %settings.precision, "size" => %settings.size);

    let environment = Environment::new(logger.clone(), db, cache);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate: routes::admin::TerminationFunctionWrapper = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // the receiver is only gone once shutdown is already under way
            let _ = termination_sender.send(()).await;
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();
        let recovery_logger = logger.clone();

        let routes = routes::make_api(environment.clone())
            .recover(move |r| routes::format_rejection(recovery_logger.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();

        let routes = routes::admin::make_healthz_route()
            .or(routes::admin::make_termination_route(terminate.clone()));

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
