pub mod app_config;
pub mod booking;
pub mod config;
pub mod month;
pub mod preview;
pub mod sessions;
pub mod views;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use booking::{booking_message, booking_url, DEFAULT_MESSAGING_BASE_URL};
pub use config::{load_app_config, load_app_config_from_env};
pub use month::MonthKey;
pub use sessions::{Session, SessionStatus, DEFAULT_LOCATION, DEFAULT_MODEL};
pub use views::{
    filter_by_location, location_options, sessions_in_month, LocationFilter, StatusCounts,
};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid month: {0}")]
    InvalidMonth(String),

    #[error("invalid session status: {0}")]
    InvalidStatus(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
