use std::env;
use std::str::FromStr;

use url::Url;

use crate::cache::CacheSettings;
use crate::flickr::{FlickrConfig, DEFAULT_PHOTO_URL, DEFAULT_SEARCH_URL};

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable if it's set and
/// not blank.
pub fn get_optional_variable(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses the named environment variable, falling back to `default` if
/// it isn't set. Panics if it's set but malformed.
pub fn parse_variable<T: FromStr>(name: &str, default: T) -> T
where T::Err: std::fmt::Display {
    match get_optional_variable(name) {
        Some(value) => value
            .parse()
            .unwrap_or_else(|e| panic!("parse {} ({:?}): {}", name, value, e)),
        None => default,
    }
}

/// Reads the photo host settings. Only the API key is required.
pub fn flickr_from_env() -> FlickrConfig {
    let url = |name: &str, default: &str| {
        let value = get_optional_variable(name).unwrap_or_else(|| default.to_owned());
        Url::parse(&value).unwrap_or_else(|_| panic!("parse {} as URL", name))
    };

    FlickrConfig::new(get_variable("TOURIST_FLICKR_API_KEY")).with_urls(
        url("TOURIST_FLICKR_SEARCH_URL", DEFAULT_SEARCH_URL),
        url("TOURIST_FLICKR_PHOTO_URL", DEFAULT_PHOTO_URL),
    )
}

pub fn cache_settings_from_env() -> CacheSettings {
    let defaults = CacheSettings::default();

    CacheSettings {
        precision: parse_variable("TOURIST_PRECISION", defaults.precision),
        size: parse_variable("TOURIST_SIZE_TAG", defaults.size),
    }
}
