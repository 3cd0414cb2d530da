pub mod base64;
pub mod config;
pub mod db;
pub mod encryption;
pub mod errors;
mod http_client;
pub mod install_handler;
pub mod logging;
pub mod secret_token;
pub mod secrets;
pub mod service_provider;


pub use http_client::build_http_client;
pub use install_handler::InstallationHandler;
