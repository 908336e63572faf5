use crate::afm::{self, Widths};
use crate::refs::{ObjectReferences, RefType};
use owned_ttf_parser::{AsFaceRef, Face, OwnedFace};
use pdf_writer::{
    types::{CidFontType, FontFlags, SystemInfo},
    Filter, Finish, Name, Pdf, Ref, Str,
};
use std::collections::{BTreeMap, HashMap};

/// Glyph advances of a built-in font
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StandardWidths {
    /// Every glyph has this advance, in 1/1000 of the font size
    Fixed(u16),
    /// Per-glyph advances indexed by WinAnsi code
    Table(&'static Widths),
}

/// One of the 14 fonts every PDF reader has built in. They are never embedded and
/// only cover the single-byte WinAnsi range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StandardFont {
    /// PostScript name, e.g. `Helvetica-Bold`
    pub name: &'static str,
    /// Ascender in units of the font size
    pub ascent: f32,
    /// Descender in units of the font size (negative)
    pub descent: f32,
    pub cap_height: f32,
    pub widths: StandardWidths,
    /// Symbol and ZapfDingbats use their own built-in encoding rather than WinAnsi
    pub symbolic: bool,
}

impl StandardFont {
    /// Advance of `ch` in units of the font size, `None` if the font can't show it
    pub fn advance(&self, ch: char) -> Option<f32> {
        let code = afm::win_ansi(ch)?;
        let width = match self.widths {
            StandardWidths::Fixed(width) => width,
            StandardWidths::Table(widths) => afm::width(widths, code),
        };
        Some(width as f32 / 1000.0)
    }
}

const fn standard(name: &'static str, ascent: f32, descent: f32, cap_height: f32, widths: StandardWidths) -> StandardFont {
    StandardFont {
        name,
        ascent,
        descent,
        cap_height,
        widths,
        symbolic: false,
    }
}

const fn symbolic(name: &'static str, ascent: f32, descent: f32, cap_height: f32, advance: u16) -> StandardFont {
    StandardFont {
        name,
        ascent,
        descent,
        cap_height,
        widths: StandardWidths::Fixed(advance),
        symbolic: true,
    }
}

const MONO: StandardWidths = StandardWidths::Fixed(600);
const HELVETICA: StandardWidths = StandardWidths::Table(&afm::HELVETICA);
const HELVETICA_BOLD: StandardWidths = StandardWidths::Table(&afm::HELVETICA_BOLD);

/// The built-in fonts, keyed by lowercase name
pub const STANDARD_FONTS: &[(&str, StandardFont)] = &[
    ("courier", standard("Courier", 0.629, -0.157, 0.562, MONO)),
    ("courier-bold", standard("Courier-Bold", 0.629, -0.157, 0.562, MONO)),
    ("courier-oblique", standard("Courier-Oblique", 0.629, -0.157, 0.562, MONO)),
    ("courier-boldoblique", standard("Courier-BoldOblique", 0.629, -0.157, 0.562, MONO)),
    ("helvetica", standard("Helvetica", 0.718, -0.207, 0.718, HELVETICA)),
    ("helvetica-bold", standard("Helvetica-Bold", 0.718, -0.207, 0.718, HELVETICA_BOLD)),
    ("helvetica-oblique", standard("Helvetica-Oblique", 0.718, -0.207, 0.718, HELVETICA)),
    ("helvetica-boldoblique", standard("Helvetica-BoldOblique", 0.718, -0.207, 0.718, HELVETICA_BOLD)),
    ("times-roman", standard("Times-Roman", 0.683, -0.217, 0.662, StandardWidths::Table(&afm::TIMES_ROMAN))),
    ("times-bold", standard("Times-Bold", 0.683, -0.217, 0.676, StandardWidths::Table(&afm::TIMES_BOLD))),
    ("times-italic", standard("Times-Italic", 0.683, -0.217, 0.653, StandardWidths::Table(&afm::TIMES_ITALIC))),
    ("times-bolditalic", standard("Times-BoldItalic", 0.683, -0.217, 0.669, StandardWidths::Table(&afm::TIMES_BOLD_ITALIC))),
    // TODO: per-glyph widths for the two symbolic fonts, indexed by their built-in encodings
    ("symbol", symbolic("Symbol", 1.01, -0.293, 0.673, 600)),
    ("zapfdingbats", symbolic("ZapfDingbats", 0.82, -0.143, 0.692, 788)),
];

/// Find a built-in font by name, ignoring ASCII case
pub fn standard_font(name: &str) -> Option<StandardFont> {
    STANDARD_FONTS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|&(_, font)| font)
}

pub enum FontSource {
    /// A TrueType/OpenType face, embedded in its entirety
    Embedded(OwnedFace),
    Standard(StandardFont),
}

/// A font loaded into the engine's document.
///
/// Embedded faces are written as Type0 fonts with Identity-H encoding, so text is shown as
/// two-byte glyph ids; standard fonts are written as Type1 fonts with WinAnsi encoding.
pub struct Font {
    pub source: FontSource,
    /// The encoding the font was requested with
    pub encoding: String,
    /// The canonical option string the font was loaded with
    pub options: String,
}

impl Font {
    /// Parse a TrueType/OpenType font from raw bytes
    pub fn load(bytes: Vec<u8>, encoding: &str, options: &str) -> Result<Font, owned_ttf_parser::FaceParsingError> {
        let face = OwnedFace::from_vec(bytes, 0)?;
        Ok(Font {
            source: FontSource::Embedded(face),
            encoding: encoding.to_string(),
            options: options.to_string(),
        })
    }

    pub fn standard(font: StandardFont, encoding: &str, options: &str) -> Font {
        Font {
            source: FontSource::Standard(font),
            encoding: encoding.to_string(),
            options: options.to_string(),
        }
    }

    fn face(&self) -> Option<&Face<'_>> {
        match &self.source {
            FontSource::Embedded(face) => Some(face.as_face_ref()),
            FontSource::Standard(_) => None,
        }
    }

    fn scale(face: &Face<'_>) -> f32 {
        1.0 / face.units_per_em() as f32
    }

    /// Distance from the baseline to the top of the font, per unit of font size
    pub fn ascent(&self) -> f32 {
        match &self.source {
            FontSource::Embedded(face) => {
                let face = face.as_face_ref();
                face.ascender() as f32 * Self::scale(face)
            }
            FontSource::Standard(font) => font.ascent,
        }
    }

    /// Distance from the baseline to the bottom of the font, per unit of font size.
    /// Note: this is usually negative
    pub fn descent(&self) -> f32 {
        match &self.source {
            FontSource::Embedded(face) => {
                let face = face.as_face_ref();
                face.descender() as f32 * Self::scale(face)
            }
            FontSource::Standard(font) => font.descent,
        }
    }

    pub fn cap_height(&self) -> f32 {
        match &self.source {
            FontSource::Embedded(face) => {
                let face = face.as_face_ref();
                face.capital_height()
                    .map(|h| h as f32 * Self::scale(face))
                    .unwrap_or_else(|| self.ascent())
            }
            FontSource::Standard(font) => font.cap_height,
        }
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        match &self.source {
            FontSource::Embedded(_) => self.glyph_id(ch).is_some(),
            FontSource::Standard(font) => font.advance(ch).is_some(),
        }
    }

    /// Width of `text` at `size`; characters the font lacks are skipped
    pub fn string_width(&self, text: &str, size: f32) -> f32 {
        match &self.source {
            FontSource::Embedded(face) => {
                let face = face.as_face_ref();
                let units: f32 = text
                    .chars()
                    .filter_map(|ch| face.glyph_index(ch))
                    .map(|gid| face.glyph_hor_advance(gid).unwrap_or_default() as f32)
                    .sum();
                units * Self::scale(face) * size
            }
            FontSource::Standard(font) => {
                text.chars().filter_map(|ch| font.advance(ch)).sum::<f32>() * size
            }
        }
    }

    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.face()
            .and_then(|face| face.glyph_index(ch))
            .map(|gid| gid.0)
    }

    /// Encode text the way the font's PDF encoding expects it. Characters that can't be
    /// encoded become the replacement glyph or `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match &self.source {
            FontSource::Embedded(_) => {
                let fallback = self
                    .glyph_id('\u{FFFD}')
                    .or_else(|| self.glyph_id('?'))
                    .unwrap_or(0);
                text.chars()
                    .flat_map(|ch| self.glyph_id(ch).unwrap_or(fallback).to_be_bytes())
                    .collect()
            }
            FontSource::Standard(_) => text
                .chars()
                .map(|ch| afm::win_ansi(ch).unwrap_or(b'?'))
                .collect(),
        }
    }

    fn postscript_name(&self, font_index: usize) -> String {
        self.face()
            .and_then(|face| {
                face.names()
                    .into_iter()
                    .find(|name| {
                        name.name_id == owned_ttf_parser::name_id::POST_SCRIPT_NAME
                            && name.is_unicode()
                    })
                    .and_then(|name| name.to_string())
            })
            .unwrap_or_else(|| format!("F{font_index}"))
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, font_index: usize, writer: &mut Pdf) {
        let font_id = refs.get_or_gen(RefType::Font(font_index));
        match &self.source {
            FontSource::Standard(font) => {
                let mut type1 = writer.type1_font(font_id);
                type1.base_font(Name(font.name.as_bytes()));
                if !font.symbolic {
                    type1.encoding_predefined(Name(b"WinAnsiEncoding"));
                }
            }
            FontSource::Embedded(face) => {
                let face = face.as_face_ref();
                let base_font = self.postscript_name(font_index);
                let glyphs = glyph_map(face);
                let cid_font_id = self.write_cid(refs, font_index, face, &base_font, &glyphs, writer);
                let to_unicode_id = write_to_unicode(refs, font_index, &glyphs, writer);

                let mut font = writer.type0_font(font_id);
                font.base_font(Name(base_font.as_bytes()));
                font.encoding_predefined(Name(b"Identity-H"));
                font.descendant_font(cid_font_id);
                font.to_unicode(to_unicode_id);
            }
        }
    }

    fn write_cid(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        face: &Face<'_>,
        base_font: &str,
        glyphs: &BTreeMap<u16, char>,
        writer: &mut Pdf,
    ) -> Ref {
        let descriptor_id = self.write_descriptor(refs, font_index, face, base_font, glyphs, writer);
        let id = refs.gen(RefType::CidFont(font_index));
        let scaling = 1000.0 * Self::scale(face);

        let advances: Vec<(u16, f32)> = glyphs
            .keys()
            .map(|&gid| {
                let advance = face
                    .glyph_hor_advance(owned_ttf_parser::GlyphId(gid))
                    .unwrap_or_default();
                (gid, advance as f32 * scaling)
            })
            .collect();

        // the most common advance becomes the default width
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for (_, width) in advances.iter() {
            *counts.entry(width.to_bits()).or_insert(0) += 1;
        }
        let default_width = counts
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&bits, _)| f32::from_bits(bits))
            .unwrap_or(1000.0);

        let mut cid_font = writer.cid_font(id);
        cid_font.subtype(CidFontType::Type2);
        cid_font.base_font(Name(base_font.as_bytes()));
        cid_font.system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        });
        cid_font.font_descriptor(descriptor_id);
        cid_font.default_width(default_width);

        // runs of consecutive glyph ids share one widths entry
        let mut widths = cid_font.widths();
        let mut run: Vec<f32> = Vec::new();
        let mut run_start: u16 = 0;
        for &(gid, width) in advances.iter() {
            if !run.is_empty() && gid as usize != run_start as usize + run.len() {
                widths.consecutive(run_start, run.drain(..));
            }
            if run.is_empty() {
                run_start = gid;
            }
            run.push(width);
        }
        if !run.is_empty() {
            widths.consecutive(run_start, run.drain(..));
        }
        widths.finish();

        cid_font.cid_to_gid_map_predefined(Name(b"Identity"));
        id
    }

    fn write_descriptor(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        face: &Face<'_>,
        base_font: &str,
        glyphs: &BTreeMap<u16, char>,
        writer: &mut Pdf,
    ) -> Ref {
        let data_id = refs.gen(RefType::FontData(font_index));
        if let FontSource::Embedded(owned) = &self.source {
            let data = owned.as_slice();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
                data,
                miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
            );
            let mut stream = writer.stream(data_id, compressed.as_slice());
            stream.filter(Filter::FlateDecode);
            stream.pair(Name(b"Length1"), data.len() as i32);
        }

        let scaling = 1000.0 * Self::scale(face);
        let max_width = glyphs
            .keys()
            .filter_map(|&gid| face.glyph_hor_advance(owned_ttf_parser::GlyphId(gid)))
            .max()
            .unwrap_or_default() as f32
            * scaling;
        let global = face.global_bounding_box();

        let id = refs.gen(RefType::FontDescriptor(font_index));
        let mut descriptor = writer.font_descriptor(id);
        descriptor.name(Name(base_font.as_bytes()));

        let mut flags = FontFlags::NON_SYMBOLIC;
        if face.is_monospaced() {
            flags.insert(FontFlags::FIXED_PITCH);
        }
        if face.is_italic() {
            flags.insert(FontFlags::ITALIC);
        }
        descriptor.flags(flags);
        descriptor.bbox(pdf_writer::Rect {
            x1: global.x_min as f32 * scaling,
            y1: global.y_min as f32 * scaling,
            x2: global.x_max as f32 * scaling,
            y2: global.y_max as f32 * scaling,
        });
        descriptor.italic_angle(face.italic_angle());
        descriptor.ascent(face.ascender() as f32 * scaling);
        descriptor.descent(face.descender() as f32 * scaling);
        descriptor.cap_height(self.cap_height() * 1000.0);
        // not recorded in TrueType fonts; 80 is what most producers write
        descriptor.stem_v(80.0);
        descriptor.max_width(max_width);
        descriptor.font_file2(data_id);
        id
    }
}

/// Every glyph id reachable from a Unicode cmap subtable, with the first character
/// that maps to it
fn glyph_map(face: &Face<'_>) -> BTreeMap<u16, char> {
    let mut map: BTreeMap<u16, char> = BTreeMap::new();
    let Some(cmap) = face.tables().cmap else {
        return map;
    };
    for subtable in cmap.subtables.into_iter().filter(|table| table.is_unicode()) {
        subtable.codepoints(|codepoint| {
            if let (Ok(ch), Some(gid)) = (char::try_from(codepoint), subtable.glyph_index(codepoint)) {
                if gid.0 > 0 {
                    map.entry(gid.0).or_insert(ch);
                }
            }
        });
    }
    map
}

fn write_to_unicode(
    refs: &mut ObjectReferences,
    font_index: usize,
    glyphs: &BTreeMap<u16, char>,
    writer: &mut Pdf,
) -> Ref {
    let id = refs.gen(RefType::ToUnicode(font_index));

    let mut map = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo\n\
         << /Registry (Adobe)\n\
         /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    // bfchar blocks hold at most 100 entries
    let entries: Vec<(u16, char)> = glyphs.iter().map(|(&gid, &ch)| (gid, ch)).collect();
    for block in entries.chunks(100) {
        map.push_str(&format!("{} beginbfchar\n", block.len()));
        for &(gid, ch) in block {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{unit:04x}"))
                .collect();
            map.push_str(&format!("<{gid:04x}> <{hex}>\n"));
        }
        map.push_str("endbfchar\n");
    }
    map.push_str("endcmap CMapName currentdict /CMap defineresource pop end end\n");

    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
        map.as_bytes(),
        miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
    );
    let mut stream = writer.stream(id, compressed.as_slice());
    stream.filter(Filter::FlateDecode);

    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_fonts_match_any_case() {
        assert_eq!(standard_font("Helvetica-Bold").map(|f| f.name), Some("Helvetica-Bold"));
        assert_eq!(standard_font("TIMES-ROMAN").map(|f| f.name), Some("Times-Roman"));
        assert!(standard_font("DejaVuSans").is_none());
    }

    #[test]
    fn courier_widths_are_monospaced() {
        let courier = Font::standard(standard_font("courier").unwrap(), "auto", "");
        assert!((courier.string_width("abcd", 10.0) - 24.0).abs() < 1e-4);
        assert!(courier.has_glyph('é'));
        assert!(!courier.has_glyph('\u{0085}'));
    }

    #[test]
    fn proportional_widths_follow_the_glyphs() {
        let helvetica = Font::standard(standard_font("Helvetica").unwrap(), "auto", "");
        let narrow = helvetica.string_width("iiii", 10.0);
        let wide = helvetica.string_width("WWWW", 10.0);
        assert!((narrow - 8.88).abs() < 1e-4);
        assert!((wide - 37.76).abs() < 1e-4);

        let times = Font::standard(standard_font("times-bold").unwrap(), "auto", "");
        assert!((times.string_width("Hi", 1.0) - (0.778 + 0.278)).abs() < 1e-4);
    }

    #[test]
    fn standard_text_is_encoded_as_win_ansi() {
        let helvetica = Font::standard(standard_font("Helvetica").unwrap(), "auto", "");
        assert_eq!(helvetica.encode("a€é“"), vec![b'a', 0x80, 0xE9, 0x93]);
        assert_eq!(helvetica.encode("漢\u{0093}"), vec![b'?', b'?']);
        assert!(helvetica.has_glyph('€'));
        assert!(!helvetica.has_glyph('漢'));
        assert!((helvetica.string_width("€", 10.0) - 5.56).abs() < 1e-4);
    }
}
