use tailpet_core::config::ConfigError;
use tailpet_core::{GatewayError, SessionError};
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("Not logged in; run `tailpet login` first")]
    NotLoggedIn,

    #[error("Permission denied: role {role} is not one of {required}")]
    Forbidden { role: String, required: String },

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("{}", .0)]
    Config(#[from] ConfigError),

    #[error("{}", .0)]
    Session(#[from] SessionError),

    #[error("{}", .0)]
    Gateway(#[from] GatewayError),

    #[error("Json::{}", .0)]
    Json(#[from] serde_json::Error),
}
