//! The canvas: a top-down drawing surface over an [Engine] that only ever has one page
//! open at a time.
//!
//! The canvas hides the engine's single-open-page restriction behind page numbers: it
//! remembers which engine page is active, suspends it whenever something else needs the
//! engine (a template, another page) and resumes it afterwards. Pages are only ended
//! when the canvas is closed, so any page can be drawn on until then.

use crate::engine::{Capabilities, Engine};
use crate::error::CanvasError;
use crate::graphics_state::{GraphicsState, LineStyle};
use crate::objects::ObjectRegistry;
use crate::pagesize::{Orientation, PageSize};
use crate::primitives::TextStyle;
use crate::resources::{FontDirectory, FontLocator, FontOptions, Resources};
use crate::colour::Paint;
use std::path::PathBuf;
use std::rc::Rc;

/// Substituted with the page number in page text
pub const PAGE_NUM: &str = "{PAGE_NUM}";
/// Substituted with the page count in page text
pub const PAGE_COUNT: &str = "{PAGE_COUNT}";

/// A callback run on every page when the canvas is closed, with the page number, the
/// page count and the font locator
pub type PageScript<E> =
    Box<dyn FnMut(&mut Canvas<E>, u32, u32, &dyn FontLocator) -> Result<(), CanvasError>>;

/// Canvas settings
#[derive(Clone)]
pub struct CanvasOptions {
    /// Line height as a multiple of a font's ascent-to-descent height
    pub font_height_ratio: f32,
    /// Drawn in place of images that can't be decoded
    pub broken_image: PathBuf,
    pub font_locator: Rc<dyn FontLocator>,
    /// Options file-backed fonts are loaded with
    pub default_font_options: FontOptions,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        CanvasOptions {
            font_height_ratio: 1.1,
            broken_image: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/assets/broken_image.png"
            )),
            font_locator: Rc::new(FontDirectory::new()),
            default_font_options: FontOptions::default(),
        }
    }
}

impl CanvasOptions {
    pub fn new() -> CanvasOptions {
        CanvasOptions::default()
    }

    pub fn font_height_ratio(mut self, ratio: f32) -> Self {
        self.font_height_ratio = ratio;
        self
    }

    pub fn broken_image<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.broken_image = path.into();
        self
    }

    pub fn font_locator<L: FontLocator + 'static>(mut self, locator: L) -> Self {
        self.font_locator = Rc::new(locator);
        self
    }

    pub fn default_font_options(mut self, options: FontOptions) -> Self {
        self.default_font_options = options;
        self
    }
}

/// Drawn on every page when the canvas closes
pub(crate) enum PageStamp<E: Engine> {
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        colour: Paint,
        style: LineStyle,
    },
    Script(PageScript<E>),
}

/// A drawing surface for one document.
///
/// Coordinates are in points from the top-left corner of the page, y growing downwards.
pub struct Canvas<E: Engine> {
    pub(crate) engine: E,
    pub(crate) capabilities: Capabilities,
    pub(crate) options: CanvasOptions,
    pub(crate) width: f32,
    pub(crate) height: f32,
    /// Page number as the layout engine sees it
    pub(crate) page_number: u32,
    pub(crate) page_count: u32,
    /// The engine page drawing goes to
    pub(crate) active_page: u32,
    /// Pages begun in the engine
    pub(crate) pages_created: u32,
    pub(crate) objects: ObjectRegistry,
    pub(crate) state: GraphicsState,
    pub(crate) resources: Resources,
    pub(crate) stamps: Vec<PageStamp<E>>,
    iterating: bool,
    pub(crate) closed: bool,
}

impl<E: Engine> Canvas<E> {
    /// Start a document of `size` pages with the default options. The first page is
    /// open on return.
    pub fn new(engine: E, size: PageSize, orientation: Orientation) -> Result<Self, CanvasError> {
        Canvas::with_options(engine, size, orientation, CanvasOptions::default())
    }

    pub fn with_options(
        mut engine: E,
        size: PageSize,
        orientation: Orientation,
        options: CanvasOptions,
    ) -> Result<Self, CanvasError> {
        let (width, height) = orientation.apply(size);
        let (width, height) = (width.0, height.0);
        let capabilities = engine.capabilities();

        engine.begin_document()?;
        engine.begin_page(width, height)?;
        log::debug!("started document of {width}x{height}pt pages");

        Ok(Canvas {
            engine,
            resources: Resources::new(capabilities.unicode_fonts),
            capabilities,
            options,
            width,
            height,
            page_number: 1,
            page_count: 1,
            active_page: 1,
            pages_created: 1,
            objects: ObjectRegistry::new(),
            state: GraphicsState::new(),
            stamps: Vec::new(),
            iterating: false,
            closed: false,
        })
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Override the page number. Does not switch the page being drawn on.
    pub fn set_page_number(&mut self, page_number: u32) {
        self.page_number = page_number;
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Override the page count. Does not add or remove pages.
    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
    }

    /// Flip a top-down y coordinate into the engine's bottom-up space
    pub(crate) fn y(&self, y: f32) -> f32 {
        self.height - y
    }

    pub(crate) fn ensure_open(&self) -> Result<(), CanvasError> {
        if self.closed {
            Err(CanvasError::Closed)
        } else {
            Ok(())
        }
    }

    /// Leave the active page so something else can be opened
    pub(crate) fn suspend(&mut self) -> Result<(), CanvasError> {
        self.engine.suspend_page()?;
        self.state.invalidate();
        Ok(())
    }

    /// Go back to the active page
    pub(crate) fn resume(&mut self) -> Result<(), CanvasError> {
        self.engine.resume_page(self.active_page)?;
        self.state.invalidate();
        Ok(())
    }

    /// Place pending objects on the page being left, then start a new page and make it
    /// current. Returns the new page number.
    pub fn new_page(&mut self) -> Result<u32, CanvasError> {
        self.ensure_open()?;
        if self.iterating {
            return Err(CanvasError::PageIterationInProgress);
        }
        self.place_pending()?;
        self.engine.suspend_page()?;
        self.engine.begin_page(self.width, self.height)?;
        self.state.invalidate();

        self.pages_created += 1;
        self.active_page = self.pages_created;
        self.page_count += 1;
        self.page_number = self.page_count;
        log::debug!("started page {}", self.page_number);
        Ok(self.page_number)
    }

    /// Run `f` on every page in order, with the page number and the page count. Drawing
    /// done by `f` goes to the page it was called for. The active page is restored
    /// afterwards, also when `f` fails. Adding pages from `f` fails, at any nesting depth.
    pub fn for_each_page<F>(&mut self, mut f: F) -> Result<(), CanvasError>
    where
        F: FnMut(&mut Self, u32, u32) -> Result<(), CanvasError>,
    {
        self.ensure_open()?;
        self.suspend()?;

        let active = self.active_page;
        let outer = std::mem::replace(&mut self.iterating, true);
        let visited = self.visit_pages(&mut f);
        self.iterating = outer;
        self.active_page = active;

        let resumed = self.resume();
        visited.and(resumed)
    }

    /// Leaves no page open, whether or not `f` succeeds
    fn visit_pages<F>(&mut self, f: &mut F) -> Result<(), CanvasError>
    where
        F: FnMut(&mut Self, u32, u32) -> Result<(), CanvasError>,
    {
        let count = self.page_count;
        for page in 1..=self.pages_created {
            self.active_page = page;
            self.resume()?;
            let drawn = f(self, page, count);
            self.suspend()?;
            drawn?;
        }
        Ok(())
    }

    /// Draw `text` on every page when the canvas closes. `{PAGE_NUM}` and
    /// `{PAGE_COUNT}` are replaced on each page.
    pub fn page_text(&mut self, x: f32, y: f32, text: &str, style: TextStyle) {
        self.stamps.push(PageStamp::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
    }

    /// Draw a line on every page when the canvas closes
    pub fn page_line<C: Into<Paint>>(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        colour: C,
        style: LineStyle,
    ) {
        self.stamps.push(PageStamp::Line {
            from,
            to,
            colour: colour.into(),
            style,
        });
    }

    /// Run `script` on every page when the canvas closes
    pub fn page_script<F>(&mut self, script: F)
    where
        F: FnMut(&mut Canvas<E>, u32, u32, &dyn FontLocator) -> Result<(), CanvasError> + 'static,
    {
        self.stamps.push(PageStamp::Script(Box::new(script)));
    }

    /// Scripts given as source code can't be run. Use [`page_script`](Self::page_script).
    #[deprecated(note = "use page_script with a closure")]
    pub fn page_script_source(&mut self, _code: &str) -> Result<(), CanvasError> {
        Err(CanvasError::Unsupported {
            operation: "page_script with source code",
        })
    }

    fn apply_stamps(&mut self) -> Result<(), CanvasError> {
        if self.stamps.is_empty() {
            return Ok(());
        }
        let mut stamps = std::mem::take(&mut self.stamps);
        let locator = Rc::clone(&self.options.font_locator);
        log::debug!("stamping {} item(s) on {} page(s)", stamps.len(), self.pages_created);

        self.for_each_page(|canvas, page, count| {
            for stamp in stamps.iter_mut() {
                match stamp {
                    PageStamp::Text { x, y, text, style } => {
                        let text = text
                            .replace(PAGE_NUM, &page.to_string())
                            .replace(PAGE_COUNT, &count.to_string());
                        canvas.text(*x, *y, &text, style)?;
                    }
                    PageStamp::Line {
                        from,
                        to,
                        colour,
                        style,
                    } => canvas.line(from.0, from.1, to.0, to.1, *colour, style)?,
                    PageStamp::Script(script) => script(canvas, page, count, &*locator)?,
                }
            }
            Ok(())
        })
    }

    /// Set a document info entry, e.g. `Title` or `Author`
    pub fn add_info(&mut self, label: &str, value: &str) -> Result<(), CanvasError> {
        self.ensure_open()?;
        self.engine.set_info(label, value)?;
        Ok(())
    }

    /// Finish the document: apply page stamps, place pending objects on the current page
    /// and end every page. Nothing can be drawn afterwards.
    pub fn close(&mut self) -> Result<(), CanvasError> {
        self.ensure_open()?;
        self.apply_stamps()?;
        self.place_pending()?;

        self.engine.suspend_page()?;
        for page in 1..=self.pages_created {
            self.engine.resume_page(page)?;
            self.engine.end_page()?;
        }
        self.engine.end_document()?;
        self.closed = true;
        log::debug!("closed document with {} page(s)", self.pages_created);
        Ok(())
    }

    /// The finished document, closing the canvas first if needed
    pub fn output(&mut self) -> Result<Vec<u8>, CanvasError> {
        if !self.closed {
            self.close()?;
        }
        Ok(self.engine.buffer()?)
    }
}
