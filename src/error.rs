//! Error types shared by the shell components

use crate::instance::Signature;

/// Errors raised by the viewer shell
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// `render` was called before any text content source was set
    #[error("No \"textContentSource\" parameter specified.")]
    NoTextContentSource,

    /// The text layer pipeline failed while extracting or laying out text
    #[error("text layer pipeline: {detail}")]
    Pipeline { detail: String },

    #[error("Invalid type for preference: {name}")]
    InvalidPreference { name: String },

    #[error("unknown viewer instance {0}")]
    UnknownInstance(Signature),

    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    #[error("image encoding: {detail}")]
    ImageEncoding { detail: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShellError {
    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline { detail: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { detail: msg.into() }
    }

    pub fn image_encoding(msg: impl Into<String>) -> Self {
        Self::ImageEncoding { detail: msg.into() }
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
