pub mod app;
pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod gallery;
pub mod leases;
pub mod logging;
pub mod notify;
pub mod photos;
pub mod projects;
pub mod thumbnails;
pub mod urls;

pub use app::App;
pub use config::Config;
