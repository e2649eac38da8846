use std::error::Error;

use dotenv::dotenv;
use structopt::StructOpt;

use log::{debug, info, initialize_logger};
use tourist::config::flickr_from_env;
use tourist::flickr::{FlickrClient, PhotoApi, SizeTag};
use tourist::geo::{compute_bounding_box, Precision};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "search-photos",
    about = "Search for photos around a coordinate and print the results"
)]
struct Opt {
    #[structopt(allow_hyphen_values = true)]
    latitude: f64,

    #[structopt(allow_hyphen_values = true)]
    longitude: f64,

    /// One of meter, ten-meter, hundred-meter, kilometer or ten-kilometer
    #[structopt(long, default_value = "kilometer")]
    precision: Precision,

    /// One of thumbnail, small, medium or large
    #[structopt(long, default_value = "large")]
    size: SizeTag,

    #[structopt(long, default_value = "1")]
    page: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let bbox = compute_bounding_box(opt.latitude, opt.longitude, opt.precision)?;
    info!(logger, "Searching..."; "bbox" => &bbox, "page" => opt.page);

    let client = FlickrClient::new(flickr_from_env());
    let results = client
        .search(opt.latitude, opt.longitude, opt.precision, opt.page)
        .await?;

    debug!(logger, "Found photos"; "total" => &results.total, "pages" => results.pages);

    println!("{}", serde_json::to_string_pretty(&results)?);

    for photo in &results.photo {
        println!("{}", client.image_url(&photo.source(), opt.size)?);
    }

    Ok(())
}
