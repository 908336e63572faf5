#![allow(dead_code)]

use pdf_canvas::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where a call went
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    Page(u32),
    Template(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BeginDocument,
    EndDocument,
    SetInfo(String, String),
    BeginPage(u32),
    EndPage(u32),
    SuspendPage(u32),
    ResumePage(u32),
    BeginTemplate(usize),
    EndTemplate(usize),
    PlaceTemplate(usize, [f32; 4]),
    Save,
    Restore,
    Concat([f32; 6]),
    SetColour(ColourTarget, Colour),
    CreateGState(String),
    SetGState(usize),
    LineWidth(f32),
    LineCap(LineCap),
    LineJoin(LineJoin),
    Dash(Vec<f32>),
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo([f32; 6]),
    Rect([f32; 4]),
    Circle(f32, f32, f32),
    Arc([f32; 6]),
    ClosePath,
    Stroke,
    Fill,
    Clip,
    RegisterFont(String, FontFileKind, PathBuf),
    LoadFont(String, String, String),
    SetFont(usize, f32),
    ShowText(String, f32, f32, TextPlacement),
    LoadImage(PathBuf, ImageKind),
    PlaceImage(usize, [f32; 4]),
    AddLink(Rect, LinkTarget),
    NamedDestination(String),
}

/// An [Engine] that checks the single-open-context protocol like a real one and
/// records every call along with the page or template it went to.
pub struct RecordingEngine {
    pub calls: Vec<(Option<Target>, Call)>,
    pub capabilities: Capabilities,
    /// Images whose loading fails as if the file were corrupt
    pub corrupt_images: HashSet<PathBuf>,
    context: Option<Target>,
    ended: Vec<bool>,
    templates: usize,
    fonts: usize,
    gstates: usize,
    images: usize,
    started: bool,
    finished: bool,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        RecordingEngine::new()
    }
}

impl RecordingEngine {
    pub fn new() -> RecordingEngine {
        RecordingEngine {
            calls: Vec::new(),
            capabilities: Capabilities {
                reopen_templates: false,
                path_construction: true,
                unicode_fonts: true,
                image_kinds: vec![ImageKind::Png, ImageKind::Jpeg, ImageKind::Svg],
            },
            corrupt_images: HashSet::new(),
            context: None,
            ended: Vec::new(),
            templates: 0,
            fonts: 0,
            gstates: 0,
            images: 0,
            started: false,
            finished: false,
        }
    }

    pub fn with_capabilities(capabilities: Capabilities) -> RecordingEngine {
        RecordingEngine {
            capabilities,
            ..RecordingEngine::new()
        }
    }

    fn record(&mut self, call: Call) {
        self.calls.push((self.context, call));
    }

    fn draw(&mut self, call: Call) -> Result<(), EngineError> {
        if self.context.is_none() {
            return Err(EngineError::NoActiveContext);
        }
        self.record(call);
        Ok(())
    }

    fn idle(&self) -> Result<(), EngineError> {
        if !self.started {
            return Err(EngineError::NotStarted);
        }
        if self.finished {
            return Err(EngineError::AlreadyFinished);
        }
        match self.context {
            Some(_) => Err(EngineError::ContextActive),
            None => Ok(()),
        }
    }

    fn open_page(&self) -> Result<u32, EngineError> {
        match self.context {
            Some(Target::Page(page)) => Ok(page),
            _ => Err(EngineError::NoActiveContext),
        }
    }

    /// Every call made while `target` was open
    pub fn calls_on(&self, target: Target) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|(context, _)| *context == Some(target))
            .map(|(_, call)| call)
            .collect()
    }

    pub fn count<F: Fn(&Call) -> bool>(&self, matches: F) -> usize {
        self.calls.iter().filter(|(_, call)| matches(call)).count()
    }

    /// Pages each template was placed on, in order
    pub fn placements(&self, template: usize) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|(context, call)| match (context, call) {
                (Some(Target::Page(page)), Call::PlaceTemplate(t, _)) if *t == template => {
                    Some(*page)
                }
                _ => None,
            })
            .collect()
    }
}

impl Engine for RecordingEngine {
    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    fn begin_document(&mut self) -> Result<(), EngineError> {
        self.started = true;
        self.record(Call::BeginDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), EngineError> {
        self.idle()?;
        if let Some(page) = self.ended.iter().position(|ended| !ended) {
            return Err(EngineError::PageNotEnded(page as u32 + 1));
        }
        self.finished = true;
        self.record(Call::EndDocument);
        Ok(())
    }

    fn buffer(&mut self) -> Result<Vec<u8>, EngineError> {
        if !self.finished {
            return Err(EngineError::NotStarted);
        }
        Ok(b"%PDF-recorded".to_vec())
    }

    fn set_info(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.record(Call::SetInfo(key.to_string(), value.to_string()));
        Ok(())
    }

    fn begin_page(&mut self, _width: f32, _height: f32) -> Result<(), EngineError> {
        self.idle()?;
        self.ended.push(false);
        let page = self.ended.len() as u32;
        self.context = Some(Target::Page(page));
        self.record(Call::BeginPage(page));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), EngineError> {
        let page = self.open_page()?;
        self.record(Call::EndPage(page));
        self.ended[page as usize - 1] = true;
        self.context = None;
        Ok(())
    }

    fn suspend_page(&mut self) -> Result<(), EngineError> {
        let page = self.open_page()?;
        self.record(Call::SuspendPage(page));
        self.context = None;
        Ok(())
    }

    fn resume_page(&mut self, page: u32) -> Result<(), EngineError> {
        self.idle()?;
        match self.ended.get((page as usize).wrapping_sub(1)) {
            None => return Err(EngineError::PageNotFound(page)),
            Some(true) => return Err(EngineError::PageClosed(page)),
            Some(false) => {}
        }
        self.context = Some(Target::Page(page));
        self.record(Call::ResumePage(page));
        Ok(())
    }

    fn begin_template(&mut self, _width: f32, _height: f32) -> Result<TemplateHandle, EngineError> {
        self.idle()?;
        let template = self.templates;
        self.templates += 1;
        self.context = Some(Target::Template(template));
        self.record(Call::BeginTemplate(template));
        Ok(TemplateHandle(template))
    }

    fn end_template(&mut self) -> Result<(), EngineError> {
        match self.context {
            Some(Target::Template(template)) => {
                self.record(Call::EndTemplate(template));
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
        if template.0 >= self.templates {
            return Err(EngineError::UnknownTemplate(template));
        }
        self.draw(Call::PlaceTemplate(template.0, [x, y, width, height]))
    }

    fn save(&mut self) -> Result<(), EngineError> {
        self.draw(Call::Save)
    }

    fn restore(&mut self) -> Result<(), EngineError> {
        self.draw(Call::Restore)
    }

    fn concat(&mut self, transform: Transform) -> Result<(), EngineError> {
        self.draw(Call::Concat(transform.as_array()))
    }

    fn set_colour(&mut self, target: ColourTarget, colour: Colour) -> Result<(), EngineError> {
        self.draw(Call::SetColour(target, colour))
    }

    fn create_gstate(&mut self, options: &GStateOptions) -> Result<GStateHandle, EngineError> {
        self.record(Call::CreateGState(options.to_string()));
        self.gstates += 1;
        Ok(GStateHandle(self.gstates - 1))
    }

    fn set_gstate(&mut self, gstate: GStateHandle) -> Result<(), EngineError> {
        self.draw(Call::SetGState(gstate.0))
    }

    fn set_line_width(&mut self, width: f32) -> Result<(), EngineError> {
        self.draw(Call::LineWidth(width))
    }

    fn set_line_cap(&mut self, cap: LineCap) -> Result<(), EngineError> {
        self.draw(Call::LineCap(cap))
    }

    fn set_line_join(&mut self, join: LineJoin) -> Result<(), EngineError> {
        self.draw(Call::LineJoin(join))
    }

    fn set_dash(&mut self, pattern: &[f32], _phase: f32) -> Result<(), EngineError> {
        if pattern.iter().any(|&segment| segment <= 0.0) {
            return Err(EngineError::Unsupported("dash segments must be positive"));
        }
        self.draw(Call::Dash(pattern.to_vec()))
    }

    fn move_to(&mut self, x: f32, y: f32) -> Result<(), EngineError> {
        self.draw(Call::MoveTo(x, y))
    }

    fn line_to(&mut self, x: f32, y: f32) -> Result<(), EngineError> {
        self.draw(Call::LineTo(x, y))
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
        self.draw(Call::CurveTo([x1, y1, x2, y2, x3, y3]))
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), EngineError> {
        self.draw(Call::Rect([x, y, width, height]))
    }

    fn circle(&mut self, x: f32, y: f32, radius: f32) -> Result<(), EngineError> {
        self.draw(Call::Circle(x, y, radius))
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
        self.draw(Call::Arc([x, y, rx, ry, start, end]))
    }

    fn close_path(&mut self) -> Result<(), EngineError> {
        self.draw(Call::ClosePath)
    }

    fn stroke(&mut self) -> Result<(), EngineError> {
        self.draw(Call::Stroke)
    }

    fn fill(&mut self) -> Result<(), EngineError> {
        self.draw(Call::Fill)
    }

    fn clip(&mut self) -> Result<(), EngineError> {
        self.draw(Call::Clip)
    }

    fn register_font_file(
        &mut self,
        face: &str,
        kind: FontFileKind,
        path: &Path,
    ) -> Result<(), EngineError> {
        self.record(Call::RegisterFont(face.to_string(), kind, path.to_path_buf()));
        Ok(())
    }

    fn load_font(
        &mut self,
        name: &str,
        encoding: &str,
        options: &str,
    ) -> Result<FontHandle, EngineError> {
        self.record(Call::LoadFont(
            name.to_string(),
            encoding.to_string(),
            options.to_string(),
        ));
        self.fonts += 1;
        Ok(FontHandle(self.fonts - 1))
    }

    fn set_font(&mut self, font: FontHandle, size: f32) -> Result<(), EngineError> {
        self.draw(Call::SetFont(font.0, size))
    }

    fn font_metric(&self, _font: FontHandle, metric: FontMetric) -> Result<f32, EngineError> {
        Ok(match metric {
            FontMetric::Ascender => 0.8,
            FontMetric::Descender => -0.2,
        })
    }

    fn string_width(&self, text: &str, _font: FontHandle, size: f32) -> Result<f32, EngineError> {
        Ok(text.chars().count() as f32 * size * 0.5)
    }

    fn has_glyph(&self, _font: FontHandle, ch: char) -> Result<bool, EngineError> {
        Ok(ch.is_ascii())
    }

    fn show_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        placement: &TextPlacement,
    ) -> Result<(), EngineError> {
        self.draw(Call::ShowText(text.to_string(), x, y, *placement))
    }

    fn load_image(&mut self, path: &Path, kind: ImageKind) -> Result<ImageHandle, EngineError> {
        if self.corrupt_images.contains(path) {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "corrupt image",
            )));
        }
        self.record(Call::LoadImage(path.to_path_buf(), kind));
        self.images += 1;
        Ok(ImageHandle(self.images - 1))
    }

    fn place_image(
        &mut self,
        image: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), EngineError> {
        self.draw(Call::PlaceImage(image.0, [x, y, width, height]))
    }

    fn add_link(&mut self, area: Rect, target: LinkTarget) -> Result<(), EngineError> {
        self.open_page()?;
        self.record(Call::AddLink(area, target));
        Ok(())
    }

    fn add_named_destination(&mut self, name: &str) -> Result<(), EngineError> {
        self.open_page()?;
        self.record(Call::NamedDestination(name.to_string()));
        Ok(())
    }
}

/// A letter-sized canvas over a fresh recording engine
pub fn letter_canvas() -> Canvas<RecordingEngine> {
    Canvas::new(RecordingEngine::new(), pagesize::LETTER, Orientation::Portrait)
        .expect("canvas starts")
}

/// The bundled placeholder image, a small valid PNG
pub fn broken_image_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/broken_image.png"))
}
