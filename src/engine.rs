//! The document engine the canvas drives.
//!
//! An [Engine] is a stateful document writer: exactly one page (or template) is open for
//! drawing at a time, pages are left with [`suspend_page`](Engine::suspend_page) and
//! re-entered with [`resume_page`](Engine::resume_page), and every resource it creates is
//! referred to through an opaque handle. All coordinates are in points with the origin at
//! the bottom-left corner.
//!
//! Engines differ in what they can do. Instead of branching on engine versions, the canvas
//! reads the engine's [Capabilities] once when it is created.

use crate::colour::Colour;
use crate::rect::Rect;
use crate::transform::Transform;
use std::fmt;
use std::path::Path;
use thiserror::Error;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// A font loaded by the engine
    FontHandle
);
handle!(
    /// An image loaded by the engine
    ImageHandle
);
handle!(
    /// A named graphics state created by the engine
    GStateHandle
);
handle!(
    /// A template (reusable block of drawing commands), also the canvas' object handle
    TemplateHandle
);

/// What an engine can do, read once when the canvas is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    /// Closed templates can be re-opened to append content
    pub reopen_templates: bool,
    /// Arbitrary paths (curves) can be built, used for rounded clipping
    pub path_construction: bool,
    /// Fonts can be loaded with a Unicode encoding
    pub unicode_fonts: bool,
    /// Image formats the engine can decode
    pub image_kinds: Vec<ImageKind>,
}

impl Capabilities {
    pub fn supports_image(&self, kind: ImageKind) -> bool {
        self.image_kinds.contains(&kind)
    }
}

/// Image formats the canvas can hand to an engine
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Svg,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Webp => "webp",
            ImageKind::Tiff => "tiff",
            ImageKind::Svg => "svg",
        };
        f.write_str(name)
    }
}

/// Which colour slot a colour call targets
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColourTarget {
    Fill,
    Stroke,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl std::str::FromStr for LineCap {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "butt" => Ok(LineCap::Butt),
            "round" => Ok(LineCap::Round),
            "square" => Ok(LineCap::Square),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl std::str::FromStr for LineJoin {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miter" => Ok(LineJoin::Miter),
            "round" => Ok(LineJoin::Round),
            "bevel" => Ok(LineJoin::Bevel),
            _ => Err(()),
        }
    }
}

/// Blend modes for graphics states. Only `Normal` is ever requested by the canvas.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
}

/// The properties of a named graphics state.
///
/// Its [Display] form is the canonical option string that graphics states are
/// deduplicated by, e.g. `opacityfill=0.5 opacitystroke=0.5`.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct GStateOptions {
    pub fill_opacity: Option<f32>,
    pub stroke_opacity: Option<f32>,
    pub blend_mode: BlendMode,
}

impl GStateOptions {
    pub fn fill_opacity(opacity: f32) -> Self {
        GStateOptions {
            fill_opacity: Some(opacity),
            ..Default::default()
        }
    }

    pub fn stroke_opacity(opacity: f32) -> Self {
        GStateOptions {
            stroke_opacity: Some(opacity),
            ..Default::default()
        }
    }

    pub fn opacity(opacity: f32) -> Self {
        GStateOptions {
            fill_opacity: Some(opacity),
            stroke_opacity: Some(opacity),
            ..Default::default()
        }
    }
}

impl fmt::Display for GStateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(2);
        if let Some(o) = self.fill_opacity {
            parts.push(format!("opacityfill={o}"));
        }
        if let Some(o) = self.stroke_opacity {
            parts.push(format!("opacitystroke={o}"));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Font metrics queried from an engine, all in units of the font size
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FontMetric {
    Ascender,
    /// Usually negative
    Descender,
}

/// The kind of file registered for a font face
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FontFileKind {
    /// Glyph outlines (TrueType, OpenType, Type1)
    Outline,
    /// Metrics only (AFM)
    Metrics,
}

/// How a line of text is set relative to its baseline start
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TextPlacement {
    /// Counter-clockwise rotation in degrees
    pub rotate: f32,
    pub word_spacing: f32,
    pub char_spacing: f32,
}

/// Where a link annotation leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Uri(String),
    /// A destination registered with [`Engine::add_named_destination`]
    Named(String),
}

/// Errors an engine reports. The canvas passes these through untouched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("the document has not been started")]
    NotStarted,

    #[error("the document has already been finished")]
    AlreadyFinished,

    #[error("no page or template is open")]
    NoActiveContext,

    #[error("a page or template is still open")]
    ContextActive,

    #[error("page {0} does not exist")]
    PageNotFound(u32),

    #[error("page {0} has already been ended")]
    PageClosed(u32),

    #[error("page {0} was left open")]
    PageNotEnded(u32),

    #[error("no template is being recorded")]
    TemplateNotOpen,

    #[error("unknown template {0}")]
    UnknownTemplate(TemplateHandle),

    #[error("unknown font {0}")]
    UnknownFont(FontHandle),

    #[error("unknown image {0}")]
    UnknownImage(ImageHandle),

    #[error("unknown graphics state {0}")]
    UnknownGState(GStateHandle),

    #[error("no font has been selected")]
    NoFontSelected,

    #[error("font '{0}' not found")]
    FontNotFound(String),

    #[error("font file '{0}' is not a TrueType or OpenType font")]
    UnsupportedFontFile(String),

    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Font(#[from] owned_ttf_parser::FaceParsingError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Svg(#[from] usvg::Error),

    #[error("failed to convert SVG: {0}")]
    SvgConversion(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stateful document writer.
///
/// Page numbers are 1-based. Drawing calls apply to whichever page or template is
/// currently open and fail with [EngineError::NoActiveContext] when nothing is.
pub trait Engine {
    /// What this engine supports. Read once by the canvas.
    fn capabilities(&self) -> Capabilities;

    fn begin_document(&mut self) -> Result<(), EngineError>;
    /// Ends the document. Every page must have been ended.
    fn end_document(&mut self) -> Result<(), EngineError>;
    /// The finished document
    fn buffer(&mut self) -> Result<Vec<u8>, EngineError>;
    fn set_info(&mut self, key: &str, value: &str) -> Result<(), EngineError>;

    /// Appends a page and makes it the open page. Nothing may be open.
    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), EngineError>;
    /// Ends the open page; it can no longer be resumed
    fn end_page(&mut self) -> Result<(), EngineError>;
    /// Leaves the open page without ending it
    fn suspend_page(&mut self) -> Result<(), EngineError>;
    /// Re-opens a suspended page. Nothing may be open.
    fn resume_page(&mut self, page: u32) -> Result<(), EngineError>;

    /// Starts recording a template. Nothing may be open.
    fn begin_template(&mut self, width: f32, height: f32) -> Result<TemplateHandle, EngineError>;
    fn end_template(&mut self) -> Result<(), EngineError>;
    /// Re-opens a finished template for more content. Most engines can't.
    fn reopen_template(&mut self, template: TemplateHandle) -> Result<(), EngineError> {
        let _ = template;
        Err(EngineError::Unsupported("reopen_template"))
    }
    /// Draws a template into the open context, scaled to fill the given box
    fn place_template(
        &mut self,
        template: TemplateHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError>;

    fn save(&mut self) -> Result<(), EngineError>;
    fn restore(&mut self) -> Result<(), EngineError>;
    fn concat(&mut self, transform: Transform) -> Result<(), EngineError>;

    fn set_colour(&mut self, target: ColourTarget, colour: Colour) -> Result<(), EngineError>;
    fn create_gstate(&mut self, options: &GStateOptions) -> Result<GStateHandle, EngineError>;
    fn set_gstate(&mut self, gstate: GStateHandle) -> Result<(), EngineError>;

    fn set_line_width(&mut self, width: f32) -> Result<(), EngineError>;
    fn set_line_cap(&mut self, cap: LineCap) -> Result<(), EngineError>;
    fn set_line_join(&mut self, join: LineJoin) -> Result<(), EngineError>;
    /// An empty pattern means a solid line. Segments must be positive.
    fn set_dash(&mut self, pattern: &[f32], phase: f32) -> Result<(), EngineError>;

    fn move_to(&mut self, x: f32, y: f32) -> Result<(), EngineError>;
    fn line_to(&mut self, x: f32, y: f32) -> Result<(), EngineError>;
    fn curve_to(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Result<(), EngineError>;
    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), EngineError>;
    fn circle(&mut self, x: f32, y: f32, radius: f32) -> Result<(), EngineError>;
    /// A counter-clockwise elliptical arc from `start` to `end` degrees, as a new subpath
    fn arc(
        &mut self,
        x: f32,
        y: f32,
        rx: f32,
        ry: f32,
        start: f32,
        end: f32,
    ) -> Result<(), EngineError>;
    fn close_path(&mut self) -> Result<(), EngineError>;
    fn stroke(&mut self) -> Result<(), EngineError>;
    fn fill(&mut self) -> Result<(), EngineError>;
    /// Intersects the clipping area with the current path and discards the path
    fn clip(&mut self) -> Result<(), EngineError>;

    /// Registers a font file under a face name so a later `load_font` can find it
    fn register_font_file(
        &mut self,
        face: &str,
        kind: FontFileKind,
        path: &Path,
    ) -> Result<(), EngineError>;
    /// Loads a font by face name. `options` is the canonical font option string.
    fn load_font(
        &mut self,
        name: &str,
        encoding: &str,
        options: &str,
    ) -> Result<FontHandle, EngineError>;
    fn set_font(&mut self, font: FontHandle, size: f32) -> Result<(), EngineError>;
    fn font_metric(&self, font: FontHandle, metric: FontMetric) -> Result<f32, EngineError>;
    fn string_width(&self, text: &str, font: FontHandle, size: f32) -> Result<f32, EngineError>;
    fn has_glyph(&self, font: FontHandle, ch: char) -> Result<bool, EngineError>;
    /// Shows text with the selected font, baseline starting at `(x, y)`
    fn show_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        placement: &TextPlacement,
    ) -> Result<(), EngineError>;

    fn load_image(&mut self, path: &Path, kind: ImageKind) -> Result<ImageHandle, EngineError>;
    /// Draws an image into the open context, scaled to fill the given box
    fn place_image(
        &mut self,
        image: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError>;

    /// Adds a link annotation to the open page
    fn add_link(&mut self, area: Rect, target: LinkTarget) -> Result<(), EngineError>;
    /// Names the top of the open page as a destination
    fn add_named_destination(&mut self, name: &str) -> Result<(), EngineError>;
}
