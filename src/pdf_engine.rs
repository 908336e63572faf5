//! The bundled [Engine]: an in-memory document written out with `pdf-writer`.

use crate::colour::Colour;
use crate::document::{Document, NamedDestination};
use crate::engine::*;
use crate::font::{standard_font, Font};
use crate::form_xobject::FormXObject;
use crate::image::Image;
use crate::page::{Link, Page};
use crate::rect::Rect;
use crate::transform::Transform;
use id_arena::Id;
use pdf_writer::types::{LineCapStyle, LineJoinStyle};
use pdf_writer::{Content, Name, Str};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Bézier control distance for a quarter circle
const KAPPA: f32 = 0.552_284_8;

/// What drawing calls currently go to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Context {
    Page(usize),
    Template(usize),
}

/// An [Engine] that keeps the whole document in memory and serialises it with
/// `pdf-writer` when the document ends.
///
/// It enforces the same protocol a streaming PDF library would: one page or template open
/// at a time, pages left with `suspend_page` before anything else is opened, ended pages
/// never resumed, and every page ended before the document is.
pub struct PdfEngine {
    document: Document,
    started: bool,
    output: Option<Vec<u8>>,
    context: Option<Context>,
    font: Option<(Id<Font>, f32)>,
    font_ids: Vec<Id<Font>>,
    image_ids: Vec<Id<Image>>,
    outlines: HashMap<String, PathBuf>,
    metrics: HashMap<String, PathBuf>,
    compress: bool,
}

impl Default for PdfEngine {
    fn default() -> Self {
        PdfEngine::new()
    }
}

impl PdfEngine {
    pub fn new() -> PdfEngine {
        PdfEngine {
            document: Document::default(),
            started: false,
            output: None,
            context: None,
            font: None,
            font_ids: Vec::new(),
            image_ids: Vec::new(),
            outlines: HashMap::new(),
            metrics: HashMap::new(),
            compress: true,
        }
    }

    /// Whether page and template content streams are deflated. On by default.
    pub fn compressed(mut self, compress: bool) -> PdfEngine {
        self.compress = compress;
        self
    }

    fn ensure_writable(&self) -> Result<(), EngineError> {
        if !self.started {
            return Err(EngineError::NotStarted);
        }
        if self.output.is_some() {
            return Err(EngineError::AlreadyFinished);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        self.ensure_writable()?;
        match self.context {
            Some(_) => Err(EngineError::ContextActive),
            None => Ok(()),
        }
    }

    fn open_page(&self) -> Result<usize, EngineError> {
        match self.context {
            Some(Context::Page(index)) => Ok(index),
            _ => Err(EngineError::NoActiveContext),
        }
    }

    /// The content stream drawing calls go to
    fn content(&mut self) -> Result<&mut Content, EngineError> {
        match self.context {
            Some(Context::Page(index)) => Ok(&mut self.document.pages[index].content),
            Some(Context::Template(index)) => Ok(&mut self.document.templates[index].content),
            None => Err(EngineError::NoActiveContext),
        }
    }

    fn font(&self, handle: FontHandle) -> Result<&Font, EngineError> {
        self.font_ids
            .get(handle.0)
            .map(|&id| &self.document.fonts[id])
            .ok_or(EngineError::UnknownFont(handle))
    }

    fn image(&self, handle: ImageHandle) -> Result<(Id<Image>, &Image), EngineError> {
        self.image_ids
            .get(handle.0)
            .map(|&id| (id, &self.document.images[id]))
            .ok_or(EngineError::UnknownImage(handle))
    }

    fn add_font(&mut self, font: Font) -> FontHandle {
        let id = self.document.fonts.alloc(font);
        self.font_ids.push(id);
        FontHandle(self.font_ids.len() - 1)
    }

    /// Draws an XObject scaled from its natural size into the given box
    fn place_xobject(
        &mut self,
        name: String,
        natural: (f32, f32),
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError> {
        let (sx, sy) = (width / natural.0, height / natural.1);
        let content = self.content()?;
        content.save_state();
        content.transform([sx, 0.0, 0.0, sy, x, y]);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
        Ok(())
    }
}

impl Engine for PdfEngine {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            reopen_templates: false,
            path_construction: true,
            unicode_fonts: true,
            image_kinds: vec![
                ImageKind::Png,
                ImageKind::Jpeg,
                ImageKind::Gif,
                ImageKind::Bmp,
                ImageKind::Webp,
                ImageKind::Tiff,
                ImageKind::Svg,
            ],
        }
    }

    fn begin_document(&mut self) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::AlreadyFinished);
        }
        self.started = true;
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if let Some(index) = self.document.pages.iter().position(|page| !page.ended) {
            return Err(EngineError::PageNotEnded(index as u32 + 1));
        }
        let mut buffer = Vec::new();
        std::mem::take(&mut self.document).write(&mut buffer, self.compress)?;
        self.output = Some(buffer);
        Ok(())
    }

    fn buffer(&mut self) -> Result<Vec<u8>, EngineError> {
        self.output.clone().ok_or(EngineError::NotStarted)
    }

    fn set_info(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.ensure_writable()?;
        self.document.info.set(key, value);
        Ok(())
    }

    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.document.pages.push(Page::new(width, height));
        self.context = Some(Context::Page(self.document.pages.len() - 1));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), EngineError> {
        let index = self.open_page()?;
        self.document.pages[index].ended = true;
        self.context = None;
        Ok(())
    }

    fn suspend_page(&mut self) -> Result<(), EngineError> {
        self.open_page()?;
        self.context = None;
        Ok(())
    }

    fn resume_page(&mut self, page: u32) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let index = (page as usize)
            .checked_sub(1)
            .filter(|&i| i < self.document.pages.len())
            .ok_or(EngineError::PageNotFound(page))?;
        if self.document.pages[index].ended {
            return Err(EngineError::PageClosed(page));
        }
        self.context = Some(Context::Page(index));
        Ok(())
    }

    fn begin_template(&mut self, width: f32, height: f32) -> Result<TemplateHandle, EngineError> {
        self.ensure_idle()?;
        self.document.templates.push(FormXObject::new(width, height));
        let index = self.document.templates.len() - 1;
        self.context = Some(Context::Template(index));
        Ok(TemplateHandle(index))
    }

    fn end_template(&mut self) -> Result<(), EngineError> {
        match self.context {
            Some(Context::Template(index)) => {
                self.document.templates[index].closed = true;
                self.context = None;
                Ok(())
            }
            _ => Err(EngineError::TemplateNotOpen),
        }
    }

    fn place_template(
        &mut self,
        template: TemplateHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError> {
        let form = self
            .document
            .templates
            .get(template.0)
            .ok_or(EngineError::UnknownTemplate(template))?;
        if !form.closed {
            return Err(EngineError::ContextActive);
        }
        let natural = (form.width().0, form.height().0);
        self.place_xobject(format!("X{}", template.0), natural, x, y, width, height)
    }

    fn save(&mut self) -> Result<(), EngineError> {
        self.content()?.save_state();
        Ok(())
    }

    fn restore(&mut self) -> Result<(), EngineError> {
        self.content()?.restore_state();
        Ok(())
    }

    fn concat(&mut self, transform: Transform) -> Result<(), EngineError> {
        self.content()?.transform(transform.as_array());
        Ok(())
    }

    fn set_colour(&mut self, target: ColourTarget, colour: Colour) -> Result<(), EngineError> {
        let content = self.content()?;
        match (target, colour) {
            (ColourTarget::Fill, Colour::Grey { g }) => content.set_fill_gray(g),
            (ColourTarget::Fill, Colour::RGB { r, g, b }) => content.set_fill_rgb(r, g, b),
            (ColourTarget::Fill, Colour::CMYK { c, m, y, k }) => content.set_fill_cmyk(c, m, y, k),
            (ColourTarget::Stroke, Colour::Grey { g }) => content.set_stroke_gray(g),
            (ColourTarget::Stroke, Colour::RGB { r, g, b }) => content.set_stroke_rgb(r, g, b),
            (ColourTarget::Stroke, Colour::CMYK { c, m, y, k }) => {
                content.set_stroke_cmyk(c, m, y, k)
            }
        };
        Ok(())
    }

    fn create_gstate(&mut self, options: &GStateOptions) -> Result<GStateHandle, EngineError> {
        self.ensure_writable()?;
        self.document.gstates.push(*options);
        Ok(GStateHandle(self.document.gstates.len() - 1))
    }

    fn set_gstate(&mut self, gstate: GStateHandle) -> Result<(), EngineError> {
        if gstate.0 >= self.document.gstates.len() {
            return Err(EngineError::UnknownGState(gstate));
        }
        let name = format!("G{}", gstate.0);
        self.content()?.set_parameters(Name(name.as_bytes()));
        Ok(())
    }

    fn set_line_width(&mut self, width: f32) -> Result<(), EngineError> {
        self.content()?.set_line_width(width);
        Ok(())
    }

    fn set_line_cap(&mut self, cap: LineCap) -> Result<(), EngineError> {
        let style = match cap {
            LineCap::Butt => LineCapStyle::ButtCap,
            LineCap::Round => LineCapStyle::RoundCap,
            LineCap::Square => LineCapStyle::ProjectingSquareCap,
        };
        self.content()?.set_line_cap(style);
        Ok(())
    }

    fn set_line_join(&mut self, join: LineJoin) -> Result<(), EngineError> {
        let style = match join {
            LineJoin::Miter => LineJoinStyle::MiterJoin,
            LineJoin::Round => LineJoinStyle::RoundJoin,
            LineJoin::Bevel => LineJoinStyle::BevelJoin,
        };
        self.content()?.set_line_join(style);
        Ok(())
    }

    fn set_dash(&mut self, pattern: &[f32], phase: f32) -> Result<(), EngineError> {
        if pattern.iter().any(|&segment| segment <= 0.0) {
            return Err(EngineError::Unsupported("dash segments must be positive"));
        }
        self.content()?
            .set_dash_pattern(pattern.iter().copied(), phase);
        Ok(())
    }

    fn move_to(&mut self, x: f32, y: f32) -> Result<(), EngineError> {
        self.content()?.move_to(x, y);
        Ok(())
    }

    fn line_to(&mut self, x: f32, y: f32) -> Result<(), EngineError> {
        self.content()?.line_to(x, y);
        Ok(())
    }

    fn curve_to(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Result<(), EngineError> {
        self.content()?.cubic_to(x1, y1, x2, y2, x3, y3);
        Ok(())
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), EngineError> {
        self.content()?.rect(x, y, width, height);
        Ok(())
    }

    fn circle(&mut self, x: f32, y: f32, radius: f32) -> Result<(), EngineError> {
        let k = radius * KAPPA;
        let content = self.content()?;
        content.move_to(x + radius, y);
        content.cubic_to(x + radius, y + k, x + k, y + radius, x, y + radius);
        content.cubic_to(x - k, y + radius, x - radius, y + k, x - radius, y);
        content.cubic_to(x - radius, y - k, x - k, y - radius, x, y - radius);
        content.cubic_to(x + k, y - radius, x + radius, y - k, x + radius, y);
        content.close_path();
        Ok(())
    }

    fn arc(
        &mut self,
        x: f32,
        y: f32,
        rx: f32,
        ry: f32,
        start: f32,
        end: f32,
    ) -> Result<(), EngineError> {
        let mut end = end;
        while end < start {
            end += 360.0;
        }
        let sweep = (end - start).to_radians();
        // at most a quarter turn per curve keeps the approximation tight
        let segments = (sweep / std::f32::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / segments as f32;
        let k = 4.0 / 3.0 * (step / 4.0).tan();

        let content = self.content()?;
        let mut angle = start.to_radians();
        let (sin, cos) = angle.sin_cos();
        content.move_to(x + rx * cos, y + ry * sin);
        for _ in 0..segments {
            let next = angle + step;
            let (s0, c0) = angle.sin_cos();
            let (s1, c1) = next.sin_cos();
            content.cubic_to(
                x + rx * (c0 - k * s0),
                y + ry * (s0 + k * c0),
                x + rx * (c1 + k * s1),
                y + ry * (s1 - k * c1),
                x + rx * c1,
                y + ry * s1,
            );
            angle = next;
        }
        Ok(())
    }

    fn close_path(&mut self) -> Result<(), EngineError> {
        self.content()?.close_path();
        Ok(())
    }

    fn stroke(&mut self) -> Result<(), EngineError> {
        self.content()?.stroke();
        Ok(())
    }

    fn fill(&mut self) -> Result<(), EngineError> {
        self.content()?.fill_nonzero();
        Ok(())
    }

    fn clip(&mut self) -> Result<(), EngineError> {
        let content = self.content()?;
        content.clip_nonzero();
        content.end_path();
        Ok(())
    }

    fn register_font_file(
        &mut self,
        face: &str,
        kind: FontFileKind,
        path: &Path,
    ) -> Result<(), EngineError> {
        let files = match kind {
            FontFileKind::Outline => &mut self.outlines,
            FontFileKind::Metrics => &mut self.metrics,
        };
        files.insert(face.to_string(), path.to_path_buf());
        Ok(())
    }

    fn load_font(
        &mut self,
        name: &str,
        encoding: &str,
        options: &str,
    ) -> Result<FontHandle, EngineError> {
        self.ensure_writable()?;
        if let Some(font) = standard_font(name) {
            return Ok(self.add_font(Font::standard(font, encoding, options)));
        }

        let Some(path) = self.outlines.get(name) else {
            // a face with only metrics can't be drawn with
            return Err(match self.metrics.get(name) {
                Some(metrics) => EngineError::UnsupportedFontFile(metrics.display().to_string()),
                None => EngineError::FontNotFound(name.to_string()),
            });
        };
        let is_sfnt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf"))
            .unwrap_or(false);
        if !is_sfnt {
            return Err(EngineError::UnsupportedFontFile(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let font = Font::load(bytes, encoding, options)?;
        Ok(self.add_font(font))
    }

    fn set_font(&mut self, font: FontHandle, size: f32) -> Result<(), EngineError> {
        let id = *self
            .font_ids
            .get(font.0)
            .ok_or(EngineError::UnknownFont(font))?;
        self.font = Some((id, size));
        Ok(())
    }

    fn font_metric(&self, font: FontHandle, metric: FontMetric) -> Result<f32, EngineError> {
        let font = self.font(font)?;
        Ok(match metric {
            FontMetric::Ascender => font.ascent(),
            FontMetric::Descender => font.descent(),
        })
    }

    fn string_width(&self, text: &str, font: FontHandle, size: f32) -> Result<f32, EngineError> {
        Ok(self.font(font)?.string_width(text, size))
    }

    fn has_glyph(&self, font: FontHandle, ch: char) -> Result<bool, EngineError> {
        Ok(self.font(font)?.has_glyph(ch))
    }

    fn show_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        placement: &TextPlacement,
    ) -> Result<(), EngineError> {
        let (id, size) = self.font.ok_or(EngineError::NoFontSelected)?;
        let encoded = self.document.fonts[id].encode(text);
        let name = format!("F{}", id.index());
        let (sin, cos) = placement.rotate.to_radians().sin_cos();

        let content = self.content()?;
        content.begin_text();
        content.set_font(Name(name.as_bytes()), size);
        content.set_word_spacing(placement.word_spacing);
        content.set_char_spacing(placement.char_spacing);
        content.set_text_matrix([cos, sin, -sin, cos, x, y]);
        content.show(Str(&encoded));
        content.end_text();
        Ok(())
    }

    fn load_image(&mut self, path: &Path, kind: ImageKind) -> Result<ImageHandle, EngineError> {
        self.ensure_writable()?;
        let image = Image::load(path, kind)?;
        let id = self.document.images.alloc(image);
        self.image_ids.push(id);
        Ok(ImageHandle(self.image_ids.len() - 1))
    }

    fn place_image(
        &mut self,
        image: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError> {
        let (id, loaded) = self.image(image)?;
        // rasters are drawn into the unit square, SVG forms at their own size
        let natural = if loaded.is_svg() {
            (loaded.width, loaded.height)
        } else {
            (1.0, 1.0)
        };
        self.place_xobject(format!("I{}", id.index()), natural, x, y, width, height)
    }

    fn add_link(&mut self, area: Rect, target: LinkTarget) -> Result<(), EngineError> {
        let index = self.open_page()?;
        self.document.pages[index].links.push(Link { area, target });
        Ok(())
    }

    fn add_named_destination(&mut self, name: &str) -> Result<(), EngineError> {
        let index = self.open_page()?;
        let top = self.document.pages[index].height();
        self.document.destinations.push(NamedDestination {
            name: name.to_string(),
            page_index: index,
            top,
        });
        Ok(())
    }
}
