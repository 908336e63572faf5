//! Fonts and images the canvas has already asked the engine for.
//!
//! Loading a font or decoding an image is expensive, so every handle the engine hands
//! out is remembered under a normalised key and reused for the rest of the document.
//! Nothing is ever evicted; a canvas lives for exactly one document.

use crate::engine::{Engine, EngineError, FontFileKind, FontHandle, ImageHandle};
use crate::font::standard_font;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when looking for a face's glyph outlines
const OUTLINE_EXTENSIONS: &[&str] = &["ttf", "TTF", "otf", "pfb"];

/// Extension of a face's metrics file
const METRICS_EXTENSION: &str = "afm";

/// Extensions stripped from a font reference before it is normalised
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "pfb", "afm", "ufm"];

/// Knows where the font files of every font family live. This is the font metrics
/// collaborator: the layout engine resolves families through it, and the canvas walks
/// its files once per document to tell the engine about them.
pub trait FontLocator {
    /// Path of a family's variant (`normal`, `bold`, `italic`, `bold_italic`), without
    /// extension
    fn font_path(&self, family: &str, variant: &str) -> Option<PathBuf>;

    /// Every known font file, without extension
    fn font_files(&self) -> Vec<PathBuf>;
}

/// A [FontLocator] backed by an in-memory table of families.
#[derive(Debug, Default, Clone)]
pub struct FontDirectory {
    families: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl FontDirectory {
    pub fn new() -> FontDirectory {
        FontDirectory::default()
    }

    /// Add a family variant. The path may be given with or without extension.
    pub fn with_font<P: Into<PathBuf>>(mut self, family: &str, variant: &str, path: P) -> Self {
        self.families
            .entry(family.to_ascii_lowercase())
            .or_default()
            .insert(variant.to_ascii_lowercase(), strip_font_extension(path.into()));
        self
    }

    /// Collect every font file in a directory, each as the `normal` variant of a family
    /// named after the file
    pub fn scan<P: AsRef<Path>>(dir: P) -> std::io::Result<FontDirectory> {
        let mut directory = FontDirectory::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_font = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            let Some(family) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if is_font {
                let family = family.to_string();
                directory = directory.with_font(&family, "normal", path);
            }
        }
        Ok(directory)
    }
}

impl FontLocator for FontDirectory {
    fn font_path(&self, family: &str, variant: &str) -> Option<PathBuf> {
        self.families
            .get(&family.to_ascii_lowercase())?
            .get(&variant.to_ascii_lowercase())
            .cloned()
    }

    fn font_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .families
            .values()
            .flat_map(|variants| variants.values().cloned())
            .collect();
        files.sort();
        files.dedup();
        files
    }
}

fn strip_font_extension(path: PathBuf) -> PathBuf {
    let known = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if known {
        path.with_extension("")
    } else {
        path
    }
}

fn with_extra_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// How a file-backed font goes into the document
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontOptions {
    pub embedding: bool,
    pub subsetting: bool,
}

impl Default for FontOptions {
    fn default() -> Self {
        FontOptions {
            embedding: true,
            subsetting: false,
        }
    }
}

/// The canonical option string handed to the engine and used in font keys
impl fmt::Display for FontOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "embedding={} subsetting={}",
            self.embedding, self.subsetting
        )
    }
}

/// The identity of a loaded font. Two requests with equal keys get the same handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// Face name: a standard font's PostScript name, or the font file's base name
    pub name: String,
    pub encoding: String,
    pub options: String,
}

impl FontKey {
    pub fn new(font: &str, encoding: &str, options: &FontOptions) -> FontKey {
        FontKey {
            name: normalize_font_name(font),
            encoding: encoding.to_string(),
            options: options.to_string(),
        }
    }

    /// Whether this is one of the built-in fonts, which need no font files
    pub fn is_standard(&self) -> bool {
        standard_font(&self.name).is_some()
    }
}

/// Reduce a font reference (a path, a file name or a bare name) to its face name.
/// Built-in fonts come out with their canonical spelling whatever case they were
/// asked for in.
pub fn normalize_font_name(font: &str) -> String {
    let path = strip_font_extension(PathBuf::from(font));
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| font.to_string());
    match standard_font(&base) {
        Some(standard) => standard.name.to_string(),
        None => base,
    }
}

/// Strip a local file scheme so `file:///tmp/a.png` and `/tmp/a.png` share a cache entry
pub fn resolve_image_path(url: &str) -> &str {
    url.strip_prefix("file://").unwrap_or(url)
}

/// The font and image handles handed out by the engine so far
#[derive(Debug)]
pub struct Resources {
    fonts: HashMap<FontKey, FontHandle>,
    images: HashMap<String, ImageHandle>,
    registered_faces: HashSet<String>,
    discovered: bool,
    default_encoding: &'static str,
}

impl Resources {
    /// `unicode_fonts` picks the encoding used when a caller doesn't name one
    pub fn new(unicode_fonts: bool) -> Resources {
        Resources {
            fonts: HashMap::new(),
            images: HashMap::new(),
            registered_faces: HashSet::new(),
            discovered: false,
            default_encoding: if unicode_fonts { "unicode" } else { "auto" },
        }
    }

    pub fn default_encoding(&self) -> &'static str {
        self.default_encoding
    }

    /// Load a font through the cache. The first file-backed font triggers discovery of
    /// every font file the locator knows.
    pub fn font<E: Engine>(
        &mut self,
        engine: &mut E,
        locator: &dyn FontLocator,
        font: &str,
        encoding: Option<&str>,
        options: &FontOptions,
    ) -> Result<FontHandle, EngineError> {
        let key = FontKey::new(font, encoding.unwrap_or(self.default_encoding), options);
        if let Some(&handle) = self.fonts.get(&key) {
            return Ok(handle);
        }

        if !key.is_standard() {
            self.discover(engine, locator)?;
        }
        log::trace!("loading font {} ({}, {})", key.name, key.encoding, key.options);
        let handle = engine.load_font(&key.name, &key.encoding, &key.options)?;
        self.fonts.insert(key, handle);
        Ok(handle)
    }

    /// Register the outline and metrics files of every known face with the engine.
    /// Runs once per document, and never registers a face twice.
    fn discover<E: Engine>(
        &mut self,
        engine: &mut E,
        locator: &dyn FontLocator,
    ) -> Result<(), EngineError> {
        if self.discovered {
            return Ok(());
        }
        self.discovered = true;

        for file in locator.font_files() {
            let Some(face) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if !self.registered_faces.insert(face.clone()) {
                continue;
            }

            let outline = OUTLINE_EXTENSIONS
                .iter()
                .map(|ext| with_extra_extension(&file, ext))
                .find(|candidate| candidate.is_file());
            if let Some(outline) = outline {
                log::debug!("font face {face}: outlines in {}", outline.display());
                engine.register_font_file(&face, FontFileKind::Outline, &outline)?;
            }

            let metrics = with_extra_extension(&file, METRICS_EXTENSION);
            if metrics.is_file() {
                log::debug!("font face {face}: metrics in {}", metrics.display());
                engine.register_font_file(&face, FontFileKind::Metrics, &metrics)?;
            }
        }
        Ok(())
    }

    pub fn cached_image(&self, path: &str) -> Option<ImageHandle> {
        self.images.get(path).copied()
    }

    pub fn cache_image(&mut self, path: &str, image: ImageHandle) {
        self.images.insert(path.to_string(), image);
    }
}
