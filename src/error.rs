use crate::engine::{EngineError, TemplateHandle};
use thiserror::Error;

/// All errors the canvas can return
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error(transparent)]
    /// The engine rejected an operation; passed through unchanged
    Engine(#[from] EngineError),

    #[error("unsupported operation: {operation}")]
    /// The operation can never succeed with this canvas
    Unsupported { operation: &'static str },

    #[error("the engine can't handle {0}")]
    /// The engine lacks a capability the operation needs, e.g. an image codec
    MissingCapability(String),

    #[error("image '{0}' could not be drawn and neither could the broken image placeholder")]
    ImageUnavailable(String),

    #[error("pages can't be added while iterating over them")]
    PageIterationInProgress,

    #[error("response headers have already been sent")]
    HeadersSent,

    #[error("unknown object {0}")]
    UnknownObject(TemplateHandle),

    #[error("the canvas has already been closed")]
    Closed,

    #[error(transparent)]
    /// An I/O error occurred
    Io(#[from] std::io::Error),
}
