use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create window: {0}")]
    WindowCreation(String),
    #[error("Window {0} not found")]
    WindowNotFound(String),
    #[error("Window operation failed: {0}")]
    WindowOperation(String),
    #[error("No live overlay window")]
    NoLiveWindow,
    #[error("Overlay controller already started")]
    AlreadyStarted,
    #[error("Settings store error: {0}")]
    Store(String),
    #[error("URL prompt failed: {0}")]
    Prompt(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
