mod canvas;
pub use canvas::*;

mod colour;
pub use colour::*;

mod document;
pub use document::*;

mod engine;
pub use engine::*;

mod error;
pub use error::*;

mod afm;

mod font;
pub use font::*;

mod form_xobject;
pub use form_xobject::*;

mod graphics_state;
pub use graphics_state::*;

mod image;
pub use self::image::*;

mod info;
pub use info::*;

mod objects;
pub use objects::*;

mod output;
pub use output::*;

mod page;
pub use page::*;

/// Named paper sizes
pub mod pagesize;
pub use pagesize::{Orientation, PageSize};

mod pdf_engine;
pub use pdf_engine::*;

mod primitives;
pub use primitives::*;

mod rect;
pub use rect::*;

pub(crate) mod refs;

mod resources;
pub use resources::*;

mod transform;
pub use transform::*;

mod units;
pub use units::*;

/// Re-export PDF-writer functionality
pub use pdf_writer;
