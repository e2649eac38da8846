pub mod cache;
pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod flickr;
pub mod geo;
pub mod photo;
pub mod pin;
pub mod routes;
