//! Drawing on the canvas: shapes, clipping, transforms, text, images and links.
//!
//! Every primitive takes top-down coordinates and flips them into the engine's
//! bottom-up space. Colours go through the graphics state tracker, and any per-colour
//! alpha is undone once the primitive is drawn so the opacity baseline holds for the
//! next one.

use crate::canvas::Canvas;
use crate::colour::{colours, Paint};
use crate::engine::{BlendMode, Engine, EngineError, FontHandle, FontMetric, ImageHandle, LinkTarget, TextPlacement};
use crate::error::CanvasError;
use crate::graphics_state::LineStyle;
use crate::image::detect_kind;
use crate::rect::Rect;
use crate::resources::{resolve_image_path, FontOptions};
use crate::transform::Transform;
use std::path::Path;
use std::rc::Rc;

/// Bézier control distance for a quarter circle
const KAPPA: f32 = 0.552_284_8;

/// How text is set
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// A standard font name or the path of a font file, with or without extension
    pub font: String,
    pub size: f32,
    pub colour: Paint,
    pub word_spacing: f32,
    pub char_spacing: f32,
    /// Clockwise, in degrees
    pub angle: f32,
}

impl TextStyle {
    /// Black, unspaced and unrotated
    pub fn new(font: &str, size: f32) -> TextStyle {
        TextStyle {
            font: font.to_string(),
            size,
            colour: colours::BLACK.into(),
            word_spacing: 0.0,
            char_spacing: 0.0,
            angle: 0.0,
        }
    }

    pub fn colour<C: Into<Paint>>(mut self, colour: C) -> Self {
        self.colour = colour.into();
        self
    }

    pub fn word_spacing(mut self, spacing: f32) -> Self {
        self.word_spacing = spacing;
        self
    }

    pub fn char_spacing(mut self, spacing: f32) -> Self {
        self.char_spacing = spacing;
        self
    }

    pub fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// Work out where a link leads. `#name` goes to a named destination and absolute URLs
/// open externally; local files can't be linked to.
pub fn link_target(url: &str) -> Option<LinkTarget> {
    if let Some(name) = url.strip_prefix('#') {
        return Some(LinkTarget::Named(name.to_string()));
    }
    if url.starts_with("file://") || !has_scheme(url) {
        return None;
    }
    Some(LinkTarget::Uri(url.to_string()))
}

fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    // single letters are drive names
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Errors that mean an image file is unusable, rather than the engine being misused
fn is_decode_failure(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::Image(_)
            | EngineError::Svg(_)
            | EngineError::SvgConversion(_)
            | EngineError::Io(_)
            | EngineError::Unsupported(_)
    )
}

impl<E: Engine> Canvas<E> {
    pub fn save(&mut self) -> Result<(), CanvasError> {
        self.engine.save()?;
        Ok(())
    }

    /// Restore the last saved graphics state. Cached colours are forgotten.
    pub fn restore(&mut self) -> Result<(), CanvasError> {
        self.engine.restore()?;
        self.state.invalidate();
        Ok(())
    }

    /// Set the opacity everything after this is drawn with. Only the normal blend mode
    /// exists.
    pub fn set_opacity(&mut self, opacity: f32, mode: BlendMode) -> Result<(), CanvasError> {
        self.state.set_opacity(&mut self.engine, opacity, mode)?;
        Ok(())
    }

    fn stroke_with(&mut self, colour: Paint, style: &LineStyle) -> Result<(), CanvasError> {
        self.state.set_stroke(&mut self.engine, colour)?;
        self.state.set_line_style(&mut self.engine, style)?;
        Ok(())
    }

    fn finish_primitive(&mut self) -> Result<(), CanvasError> {
        self.state.restore_opacity(&mut self.engine)?;
        Ok(())
    }

    pub fn line<C: Into<Paint>>(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        colour: C,
        style: &LineStyle,
    ) -> Result<(), CanvasError> {
        self.stroke_with(colour.into(), style)?;
        let (y1, y2) = (self.y(y1), self.y(y2));
        self.engine.move_to(x1, y1)?;
        self.engine.line_to(x2, y2)?;
        self.engine.stroke()?;
        self.finish_primitive()
    }

    /// An elliptical arc centred on `(x, y)` from `start` to `end` degrees
    #[allow(clippy::too_many_arguments)]
    pub fn arc<C: Into<Paint>>(
        &mut self,
        x: f32,
        y: f32,
        rx: f32,
        ry: f32,
        start: f32,
        end: f32,
        colour: C,
        style: &LineStyle,
    ) -> Result<(), CanvasError> {
        self.stroke_with(colour.into(), style)?;
        let y = self.y(y);
        self.engine.arc(x, y, rx, ry, start, end)?;
        self.engine.stroke()?;
        self.finish_primitive()
    }

    /// The outline of a rectangle whose top-left corner is `(x, y)`
    pub fn rectangle<C: Into<Paint>>(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        colour: C,
        style: &LineStyle,
    ) -> Result<(), CanvasError> {
        self.stroke_with(colour.into(), style)?;
        let bottom = self.y(y) - height;
        self.engine.rect(x, bottom, width, height)?;
        self.engine.stroke()?;
        self.finish_primitive()
    }

    pub fn filled_rectangle<C: Into<Paint>>(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        colour: C,
    ) -> Result<(), CanvasError> {
        self.state.set_fill(&mut self.engine, colour.into())?;
        let bottom = self.y(y) - height;
        self.engine.rect(x, bottom, width, height)?;
        self.engine.fill()?;
        self.finish_primitive()
    }

    /// A closed polygon through `points`, filled or outlined
    pub fn polygon<C: Into<Paint>>(
        &mut self,
        points: &[(f32, f32)],
        colour: C,
        style: &LineStyle,
        fill: bool,
    ) -> Result<(), CanvasError> {
        if points.is_empty() {
            return Ok(());
        }
        let colour = colour.into();
        if fill {
            self.state.set_fill(&mut self.engine, colour)?;
        } else {
            self.stroke_with(colour, style)?;
        }
        self.trace_polygon(points)?;
        if fill {
            self.engine.fill()?;
        } else {
            self.engine.stroke()?;
        }
        self.finish_primitive()
    }

    fn trace_polygon(&mut self, points: &[(f32, f32)]) -> Result<(), CanvasError> {
        let flipped: Vec<(f32, f32)> = points.iter().map(|&(x, y)| (x, self.y(y))).collect();
        if let Some((&(x, y), rest)) = flipped.split_first() {
            self.engine.move_to(x, y)?;
            for &(x, y) in rest {
                self.engine.line_to(x, y)?;
            }
            self.engine.close_path()?;
        }
        Ok(())
    }

    pub fn circle<C: Into<Paint>>(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        colour: C,
        style: &LineStyle,
        fill: bool,
    ) -> Result<(), CanvasError> {
        let colour = colour.into();
        if fill {
            self.state.set_fill(&mut self.engine, colour)?;
        } else {
            self.stroke_with(colour, style)?;
        }
        let y = self.y(y);
        self.engine.circle(x, y, radius)?;
        if fill {
            self.engine.fill()?;
        } else {
            self.engine.stroke()?;
        }
        self.finish_primitive()
    }

    /// Clip everything drawn until [`clipping_end`](Self::clipping_end) to a rectangle
    pub fn clipping_rectangle(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), CanvasError> {
        self.engine.save()?;
        let bottom = self.y(y) - height;
        self.engine.rect(x, bottom, width, height)?;
        self.engine.clip()?;
        Ok(())
    }

    /// Clip to a rectangle with rounded corners, given as top-left, top-right,
    /// bottom-right and bottom-left radii. Engines that can't build paths clip to the
    /// plain rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn clipping_roundrectangle(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        top_left: f32,
        top_right: f32,
        bottom_right: f32,
        bottom_left: f32,
    ) -> Result<(), CanvasError> {
        if !self.capabilities.path_construction {
            return self.clipping_rectangle(x, y, width, height);
        }

        self.engine.save()?;
        let top = self.y(y);
        let bottom = top - height;
        let (left, right) = (x, x + width);
        // control points sit this far along each edge from the corner
        let pull = |r: f32| r * (1.0 - KAPPA);

        let engine = &mut self.engine;
        engine.move_to(left + top_left, top)?;
        engine.line_to(right - top_right, top)?;
        engine.curve_to(
            right - pull(top_right),
            top,
            right,
            top - pull(top_right),
            right,
            top - top_right,
        )?;
        engine.line_to(right, bottom + bottom_right)?;
        engine.curve_to(
            right,
            bottom + pull(bottom_right),
            right - pull(bottom_right),
            bottom,
            right - bottom_right,
            bottom,
        )?;
        engine.line_to(left + bottom_left, bottom)?;
        engine.curve_to(
            left + pull(bottom_left),
            bottom,
            left,
            bottom + pull(bottom_left),
            left,
            bottom + bottom_left,
        )?;
        engine.line_to(left, top - top_left)?;
        engine.curve_to(
            left,
            top - pull(top_left),
            left + pull(top_left),
            top,
            left + top_left,
            top,
        )?;
        engine.close_path()?;
        engine.clip()?;
        Ok(())
    }

    pub fn clipping_polygon(&mut self, points: &[(f32, f32)]) -> Result<(), CanvasError> {
        self.engine.save()?;
        self.trace_polygon(points)?;
        self.engine.clip()?;
        Ok(())
    }

    /// End the innermost clipping region
    pub fn clipping_end(&mut self) -> Result<(), CanvasError> {
        self.restore()
    }

    /// Rotate what follows clockwise by `angle` degrees about `(x, y)`
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32) -> Result<(), CanvasError> {
        let y = self.y(y);
        self.engine
            .concat(Transform::rotate(-angle.to_radians()).about(x, y))?;
        Ok(())
    }

    /// Skew what follows by `angle_x` and `angle_y` degrees about `(x, y)`
    pub fn skew(&mut self, angle_x: f32, angle_y: f32, x: f32, y: f32) -> Result<(), CanvasError> {
        let y = self.y(y);
        let skew = Transform::skew(angle_y.to_radians(), angle_x.to_radians());
        self.engine.concat(skew.about(x, y))?;
        Ok(())
    }

    pub fn scale(&mut self, sx: f32, sy: f32, x: f32, y: f32) -> Result<(), CanvasError> {
        let y = self.y(y);
        self.engine.concat(Transform::scale(sx, sy).about(x, y))?;
        Ok(())
    }

    /// Move what follows right by `tx` and down by `ty`
    pub fn translate(&mut self, tx: f32, ty: f32) -> Result<(), CanvasError> {
        self.engine.concat(Transform::translate(tx, -ty))?;
        Ok(())
    }

    /// Apply a raw matrix in the engine's space
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Result<(), CanvasError> {
        self.engine.concat(Transform::new(a, b, c, d, e, f))?;
        Ok(())
    }

    /// Load a font through the resource cache. `encoding` defaults to Unicode when the
    /// engine has it.
    pub fn load_font(
        &mut self,
        font: &str,
        encoding: Option<&str>,
        options: &FontOptions,
    ) -> Result<FontHandle, CanvasError> {
        let locator = Rc::clone(&self.options.font_locator);
        let handle = self
            .resources
            .font(&mut self.engine, &*locator, font, encoding, options)?;
        Ok(handle)
    }

    fn default_font(&mut self, font: &str) -> Result<FontHandle, CanvasError> {
        let options = self.options.default_font_options;
        self.load_font(font, None, &options)
    }

    /// Draw a line of text whose top-left corner is `(x, y)`
    pub fn text(&mut self, x: f32, y: f32, text: &str, style: &TextStyle) -> Result<(), CanvasError> {
        let font = self.default_font(&style.font)?;
        self.state.set_fill(&mut self.engine, style.colour)?;
        self.engine.set_font(font, style.size)?;

        let baseline = self.y(y) - self.height_of(font, style.size)?;
        let placement = TextPlacement {
            rotate: -style.angle,
            word_spacing: style.word_spacing,
            char_spacing: style.char_spacing,
        };
        self.engine.show_text(text, x, baseline, &placement)?;
        self.finish_primitive()
    }

    fn height_of(&self, font: FontHandle, size: f32) -> Result<f32, CanvasError> {
        let ascent = self.engine.font_metric(font, FontMetric::Ascender)?;
        let descent = self.engine.font_metric(font, FontMetric::Descender)?;
        Ok(size * (ascent - descent) * self.options.font_height_ratio)
    }

    /// Width of `text` as [`text`](Self::text) would set it
    pub fn text_width(
        &mut self,
        text: &str,
        font: &str,
        size: f32,
        word_spacing: f32,
        char_spacing: f32,
    ) -> Result<f32, CanvasError> {
        let handle = self.default_font(font)?;
        let width = self.engine.string_width(text, handle, size)?;
        let spaces = text.matches(' ').count() as f32;
        let chars = text.chars().count() as f32;
        Ok(width + word_spacing * spaces + char_spacing * chars)
    }

    /// Line height: the font's ascent-to-descent height times the height ratio
    pub fn font_height(&mut self, font: &str, size: f32) -> Result<f32, CanvasError> {
        let handle = self.default_font(font)?;
        self.height_of(handle, size)
    }

    pub fn font_baseline(&mut self, font: &str, size: f32) -> Result<f32, CanvasError> {
        let height = self.font_height(font, size)?;
        Ok(height / self.options.font_height_ratio * 1.1)
    }

    pub fn font_supports_char(&mut self, font: &str, ch: char) -> Result<bool, CanvasError> {
        let handle = self.default_font(font)?;
        Ok(self.engine.has_glyph(handle, ch)?)
    }

    /// Draw an image into the box whose top-left corner is `(x, y)`. Images that can't
    /// be decoded are replaced with the broken image placeholder.
    pub fn image(&mut self, url: &str, x: f32, y: f32, width: f32, height: f32) -> Result<(), CanvasError> {
        self.ensure_open()?;
        self.draw_image(url, x, y, width, height, false)
    }

    fn draw_image(
        &mut self,
        url: &str,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        placeholder: bool,
    ) -> Result<(), CanvasError> {
        let path = resolve_image_path(url);
        let image = match self.resources.cached_image(path) {
            Some(image) => image,
            None => match self.load_image(path)? {
                Some(image) => image,
                None if placeholder => return Err(CanvasError::ImageUnavailable(path.to_string())),
                None => {
                    log::debug!("image '{path}' is unusable, drawing the broken image placeholder");
                    let broken = self.options.broken_image.to_string_lossy().into_owned();
                    return self.draw_image(&broken, x, y, width, height, true);
                }
            },
        };
        let bottom = self.y(y) - height;
        self.engine.place_image(image, x, bottom, width, height)?;
        Ok(())
    }

    /// Make the box whose top-left corner is `(x, y)` a link. Links to local files are
    /// ignored.
    pub fn add_link(&mut self, url: &str, x: f32, y: f32, width: f32, height: f32) -> Result<(), CanvasError> {
        let Some(target) = link_target(url) else {
            log::debug!("not linking to local resource '{url}'");
            return Ok(());
        };
        let bottom = self.y(y) - height;
        self.engine
            .add_link(Rect::from_origin_size(x, bottom, width, height), target)?;
        Ok(())
    }

    /// Name the current page as a link destination
    pub fn add_named_dest(&mut self, name: &str) -> Result<(), CanvasError> {
        self.engine.add_named_destination(name)?;
        Ok(())
    }
}
