use crate::engine::{EngineError, GStateOptions};
use crate::font::Font;
use crate::form_xobject::FormXObject;
use crate::image::Image;
use crate::info::Info;
use crate::page::{Page, ResourceNames};
use crate::refs::{ObjectReferences, RefType};
use id_arena::Arena;
use pdf_writer::{Finish, Name, Null, Pdf};
use std::io::Write;

/// A destination name pointing at a height on a page
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDestination {
    pub name: String,
    /// 0-based page index
    pub page_index: usize,
    pub top: f32,
}

/// The engine's in-memory document: every page, template, font, image and graphics
/// state created so far. Nothing is turned into PDF objects until [Document::write], so
/// pages stay editable for as long as the engine lets them be resumed.
#[derive(Default)]
pub struct Document {
    pub info: Info,
    pub pages: Vec<Page>,
    pub fonts: Arena<Font>,
    pub images: Arena<Image>,
    pub templates: Vec<FormXObject>,
    pub gstates: Vec<GStateOptions>,
    pub destinations: Vec<NamedDestination>,
}

impl Document {
    /// Write the entire document to the writer. The whole document is rendered in memory
    /// first, then written out in one go.
    ///
    /// Resources are written before anything that refers to them: fonts, images and
    /// graphics states first, then templates (whose ids are all reserved up front so
    /// templates can refer to each other), then pages.
    pub fn write<W: Write>(self, mut w: W, compress: bool) -> Result<(), EngineError> {
        let Document {
            info,
            pages,
            fonts,
            images,
            templates,
            gstates,
            destinations,
        } = self;

        let mut refs = ObjectReferences::new();
        let catalog_id = refs.gen(RefType::Catalog);
        let page_tree_id = refs.gen(RefType::PageTree);

        let mut writer = Pdf::new();
        info.write(&mut refs, &mut writer);

        let page_refs: Vec<_> = (0..pages.len())
            .map(|i| refs.gen(RefType::Page(i)))
            .collect();
        writer
            .pages(page_tree_id)
            .count(page_refs.len() as i32)
            .kids(page_refs);

        let resources = ResourceNames {
            fonts: fonts.len(),
            images: images.len(),
            templates: templates.len(),
            gstates: gstates.len(),
        };

        for (id, font) in fonts.iter() {
            font.write(&mut refs, id.index(), &mut writer);
        }

        for (id, image) in images.iter() {
            image.write(&mut refs, id.index(), &mut writer)?;
        }

        for (i, gstate) in gstates.iter().enumerate() {
            let id = refs.gen(RefType::GState(i));
            let mut ext = writer.ext_graphics(id);
            if let Some(opacity) = gstate.fill_opacity {
                ext.non_stroking_alpha(opacity);
            }
            if let Some(opacity) = gstate.stroke_opacity {
                ext.stroking_alpha(opacity);
            }
            ext.finish();
        }

        for i in 0..templates.len() {
            refs.gen(RefType::FormXObject(i));
        }
        for (i, template) in templates.into_iter().enumerate() {
            template.write(&mut refs, i, &resources, compress, &mut writer);
        }

        for (page_index, page) in pages.into_iter().enumerate() {
            page.write(&mut refs, page_index, &resources, compress, &mut writer)?;
        }

        let dests_id = (!destinations.is_empty()).then(|| refs.gen(RefType::Dests));
        if let Some(dests_id) = dests_id {
            let mut dests = writer.indirect(dests_id).dict();
            for dest in destinations.iter() {
                let page = refs.get_or_gen(RefType::Page(dest.page_index));
                dests
                    .insert(Name(dest.name.as_bytes()))
                    .array()
                    .item(page)
                    .item(Name(b"XYZ"))
                    .item(Null)
                    .item(dest.top)
                    .item(Null);
            }
            dests.finish();
        }

        let mut catalog = writer.catalog(catalog_id);
        catalog.pages(page_tree_id);
        if let Some(dests_id) = dests_id {
            catalog.pair(Name(b"Dests"), dests_id);
        }
        catalog.finish();

        w.write_all(writer.finish().as_slice()).map_err(Into::into)
    }
}
