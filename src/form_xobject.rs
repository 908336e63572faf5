//! Templates: reusable blocks of drawing commands, written as Form XObjects.
//!
//! A template is recorded once, while it is the engine's open context, and then stamped
//! onto any number of pages. Each placement is a `Do` of the same XObject, so the content
//! only exists once in the file.
//!
//! Templates use PDF's coordinate system where (0, 0) is at the bottom-left. When placed,
//! the template's bounding box is scaled to the box it is placed into.

use crate::page::ResourceNames;
use crate::rect::Rect;
use crate::refs::{ObjectReferences, RefType};
use crate::units::*;
use pdf_writer::{Content, Finish, Pdf};

pub struct FormXObject {
    /// Bounding box of the template content
    pub bbox: Rect,
    pub content: Content,
    /// Set once recording has ended
    pub closed: bool,
}

impl FormXObject {
    pub fn new(width: f32, height: f32) -> Self {
        FormXObject {
            bbox: Rect {
                x1: Pt(0.0),
                y1: Pt(0.0),
                x2: Pt(width),
                y2: Pt(height),
            },
            content: Content::new(),
            closed: false,
        }
    }

    /// Width of the template
    pub fn width(&self) -> Pt {
        self.bbox.width()
    }

    /// Height of the template
    pub fn height(&self) -> Pt {
        self.bbox.height()
    }

    /// Write this template using its pre-generated ref, so templates and pages can
    /// refer to it before it is written.
    pub(crate) fn write(
        self,
        refs: &mut ObjectReferences,
        index: usize,
        resources: &ResourceNames,
        compress: bool,
        writer: &mut Pdf,
    ) {
        let id = refs.get_or_gen(RefType::FormXObject(index));
        let bbox = self.bbox;
        let rendered = self.content.finish();

        let data = if compress {
            miniz_oxide::deflate::compress_to_vec_zlib(
                &rendered,
                miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
            )
        } else {
            rendered
        };

        let mut xobj = writer.form_xobject(id, &data);
        if compress {
            xobj.filter(pdf_writer::Filter::FlateDecode);
        }
        xobj.bbox(bbox.into());
        resources.write(refs, &mut xobj.resources());
        xobj.finish();
    }
}
