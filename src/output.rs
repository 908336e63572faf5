//! Sending a finished document to an HTTP-like response.

use crate::canvas::Canvas;
use crate::engine::Engine;
use crate::error::CanvasError;
use std::io::Write;

/// Where [`Canvas::stream`] sends the document: something with headers that must be
/// set before the body is written.
pub trait Response: Write {
    /// Whether headers have already gone out, after which none can be set
    fn headers_sent(&self) -> bool;

    fn set_header(&mut self, name: &str, value: &str) -> std::io::Result<()>;
}

/// How the document is presented to the receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Offer the document as a download rather than displaying it inline
    pub attachment: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions { attachment: true }
    }
}

/// The `Content-Disposition` header value for a file name. `.pdf` is appended if
/// missing.
pub fn content_disposition(filename: &str, attachment: bool) -> String {
    let mut filename = filename.replace('"', "");
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        filename.push_str(".pdf");
    }
    let kind = if attachment { "attachment" } else { "inline" };
    format!("{kind}; filename=\"{filename}\"")
}

impl<E: Engine> Canvas<E> {
    /// Close the canvas if needed and write the document to `response` with
    /// `Content-Type`, `Content-Length` and `Content-Disposition` headers.
    pub fn stream<R: Response>(
        &mut self,
        response: &mut R,
        filename: &str,
        options: &StreamOptions,
    ) -> Result<(), CanvasError> {
        if response.headers_sent() {
            return Err(CanvasError::HeadersSent);
        }
        let pdf = self.output()?;

        response.set_header("Content-Type", "application/pdf")?;
        response.set_header("Content-Length", &pdf.len().to_string())?;
        response.set_header(
            "Content-Disposition",
            &content_disposition(filename, options.attachment),
        )?;
        response.write_all(&pdf)?;
        response.flush()?;
        log::debug!("streamed {} bytes as '{filename}'", pdf.len());
        Ok(())
    }
}
