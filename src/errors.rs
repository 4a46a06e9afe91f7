//! Error types for the novanode application.
//!
//! This module defines custom error types that categorize the failures that
//! can occur while managing notes and talking to the generative model service.

use std::io;

use thiserror::Error;

use crate::Operation;

/// The main error type for the novanode application.
#[derive(Error, Debug)]
pub enum NovaError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request to the model service could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model service answered with a non-success status.
    #[error("Model service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// An operation needed an active note but none is selected.
    #[error("No note is currently open")]
    NoActiveNote,

    /// The conversation session is already running an operation.
    #[error("Session busy: {operation} is still in progress")]
    SessionBusy { operation: Operation },

    /// The in-flight call was aborted before the service answered.
    #[error("Operation canceled")]
    Canceled,

    /// Invalid payload format.
    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    /// Base64 payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// The external editor could not be launched or failed.
    #[error("{message}")]
    EditorError { message: String },
}
