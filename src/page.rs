use crate::engine::{EngineError, LinkTarget};
use crate::rect::Rect;
use crate::refs::{ObjectReferences, RefType};
use crate::units::Pt;
use pdf_writer::types::{ActionType, AnnotationType};
use pdf_writer::{Content, Finish, Name, Pdf, Ref, Str};

/// A link annotation on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub area: Rect,
    pub target: LinkTarget,
}

/// A page of the engine's document: its size, the content drawn on it so far and its
/// annotations. Content keeps accumulating across suspend/resume until the page is ended.
pub struct Page {
    /// The size of the page
    pub media_box: Rect,
    pub content: Content,
    pub links: Vec<Link>,
    /// Set once the page has been ended; it can't be resumed after that
    pub ended: bool,
}

impl Page {
    pub fn new(width: f32, height: f32) -> Page {
        Page {
            media_box: Rect {
                x1: Pt(0.0),
                y1: Pt(0.0),
                x2: Pt(width),
                y2: Pt(height),
            },
            content: Content::new(),
            links: Vec::new(),
            ended: false,
        }
    }

    pub fn height(&self) -> f32 {
        self.media_box.height().0
    }

    fn write_links(&self, refs: &mut ObjectReferences, writer: &mut Pdf) -> Vec<Ref> {
        let mut ids = Vec::with_capacity(self.links.len());
        for link in self.links.iter() {
            let id = refs.bump();
            let mut annotation = writer.annotation(id);
            annotation.subtype(AnnotationType::Link);
            annotation.rect(link.area.into());
            annotation.insert(Name(b"Border")).array().items([0.0f32, 0.0, 0.0]);
            match &link.target {
                LinkTarget::Uri(uri) => {
                    annotation.contents(pdf_writer::TextStr(uri.as_str()));
                    annotation
                        .action()
                        .action_type(ActionType::Uri)
                        .uri(Str(uri.as_bytes()));
                }
                LinkTarget::Named(name) => {
                    annotation.pair(Name(b"Dest"), Name(name.as_bytes()));
                }
            }
            annotation.finish();
            ids.push(id);
        }
        ids
    }

    pub(crate) fn write(
        self,
        refs: &mut ObjectReferences,
        page_index: usize,
        resources: &ResourceNames,
        compress: bool,
        writer: &mut Pdf,
    ) -> Result<(), EngineError> {
        let id = refs.get_or_gen(RefType::Page(page_index));
        let content_id = refs.gen(RefType::ContentForPage(page_index));
        let annotations = self.write_links(refs, writer);
        let parent = refs.get_or_gen(RefType::PageTree);

        let mut page = writer.page(id);
        page.media_box(self.media_box.into());
        page.parent(parent);
        resources.write(refs, &mut page.resources());
        page.contents(content_id);
        if !annotations.is_empty() {
            page.annotations(annotations);
        }
        page.finish();

        write_content(writer, content_id, self.content.finish(), compress);
        Ok(())
    }
}

/// Writes a content stream, deflated if asked to
pub(crate) fn write_content(writer: &mut Pdf, id: Ref, content: Vec<u8>, compress: bool) {
    if compress {
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
            &content,
            miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
        );
        writer
            .stream(id, compressed.as_slice())
            .filter(pdf_writer::Filter::FlateDecode);
    } else {
        writer.stream(id, content.as_slice());
    }
}

/// The resource names every page and template can use: `F{n}` fonts, `I{n}` images,
/// `X{n}` templates and `G{n}` graphics states, `n` being the index in the document.
pub(crate) struct ResourceNames {
    pub fonts: usize,
    pub images: usize,
    pub templates: usize,
    pub gstates: usize,
}

impl ResourceNames {
    pub fn write(&self, refs: &mut ObjectReferences, resources: &mut pdf_writer::writers::Resources) {
        let mut fonts = resources.fonts();
        for i in 0..self.fonts {
            fonts.pair(
                Name(format!("F{i}").as_bytes()),
                refs.get_or_gen(RefType::Font(i)),
            );
        }
        fonts.finish();

        let mut x_objects = resources.x_objects();
        for i in 0..self.images {
            x_objects.pair(
                Name(format!("I{i}").as_bytes()),
                refs.get_or_gen(RefType::Image(i)),
            );
        }
        for i in 0..self.templates {
            x_objects.pair(
                Name(format!("X{i}").as_bytes()),
                refs.get_or_gen(RefType::FormXObject(i)),
            );
        }
        x_objects.finish();

        let mut gstates = resources.ext_g_states();
        for i in 0..self.gstates {
            gstates.pair(
                Name(format!("G{i}").as_bytes()),
                refs.get_or_gen(RefType::GState(i)),
            );
        }
        gstates.finish();
    }
}
