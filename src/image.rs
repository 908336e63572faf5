use crate::engine::{EngineError, ImageKind};
use crate::refs::{ObjectReferences, RefType};
use image::{ColorType, DynamicImage, GenericImageView};
use miniz_oxide::deflate::{compress_to_vec_zlib, CompressionLevel};
use pdf_writer::{Filter, Finish, Pdf, Ref};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use usvg::Tree;

/// Work out an image's format from its first bytes, falling back to the file extension
/// for SVG (which has no reliable magic). `None` means the file can't be read or isn't
/// an image format the canvas knows.
pub fn detect_kind(path: &Path) -> Option<ImageKind> {
    let mut head = [0u8; 512];
    let read = std::fs::File::open(path)
        .and_then(|mut file| file.read(&mut head))
        .ok()?;
    let head = &head[..read];

    if let Ok(format) = image::guess_format(head) {
        return match format {
            image::ImageFormat::Png => Some(ImageKind::Png),
            image::ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            image::ImageFormat::Gif => Some(ImageKind::Gif),
            image::ImageFormat::Bmp => Some(ImageKind::Bmp),
            image::ImageFormat::WebP => Some(ImageKind::Webp),
            image::ImageFormat::Tiff => Some(ImageKind::Tiff),
            _ => None,
        };
    }

    let is_svg_ext = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    let text = String::from_utf8_lossy(head);
    let looks_like_svg = text.trim_start().starts_with("<svg") || text.contains("<svg");
    (is_svg_ext || looks_like_svg).then_some(ImageKind::Svg)
}

pub enum RasterImage {
    /// RGB JPEGs go into the PDF as they are
    Jpeg(Vec<u8>),
    Decoded(DynamicImage),
}

pub enum ImageData {
    Raster(RasterImage),
    Svg(Tree),
}

/// An image loaded into the engine's document
pub struct Image {
    pub data: ImageData,
    /// Natural width, pixels for rasters and user units for SVG
    pub width: f32,
    pub height: f32,
}

struct EncodeOutput {
    filter: Filter,
    bytes: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl Image {
    pub fn load(path: &Path, kind: ImageKind) -> Result<Image, EngineError> {
        let data = std::fs::read(path)?;
        match kind {
            ImageKind::Svg => Self::new_svg(&data),
            _ => Self::new_raster(data, kind),
        }
    }

    pub fn new_svg(data: &[u8]) -> Result<Image, EngineError> {
        let tree = Tree::from_data(data, &usvg::Options::default())?;
        let size = tree.size();
        Ok(Image {
            width: size.width(),
            height: size.height(),
            data: ImageData::Svg(tree),
        })
    }

    fn new_raster(data: Vec<u8>, kind: ImageKind) -> Result<Image, EngineError> {
        let format = match kind {
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Gif => image::ImageFormat::Gif,
            ImageKind::Bmp => image::ImageFormat::Bmp,
            ImageKind::Webp => image::ImageFormat::WebP,
            ImageKind::Tiff => image::ImageFormat::Tiff,
            ImageKind::Svg => return Err(EngineError::Unsupported("svg as raster")),
        };
        let decoded = image::load_from_memory_with_format(&data, format)?;
        let width = decoded.width() as f32;
        let height = decoded.height() as f32;

        let raster = match (format, decoded.color()) {
            (image::ImageFormat::Jpeg, ColorType::Rgb8) => RasterImage::Jpeg(data),
            _ => RasterImage::Decoded(decoded),
        };
        Ok(Image {
            data: ImageData::Raster(raster),
            width,
            height,
        })
    }

    pub fn is_svg(&self) -> bool {
        matches!(self.data, ImageData::Svg(_))
    }

    fn encode_raster(raster: &RasterImage) -> EncodeOutput {
        match raster {
            RasterImage::Jpeg(bytes) => EncodeOutput {
                filter: Filter::DctDecode,
                bytes: bytes.clone(),
                mask: None,
            },
            RasterImage::Decoded(image) => {
                let level = CompressionLevel::DefaultLevel as u8;
                let mask = image.color().has_alpha().then(|| {
                    let alphas: Vec<u8> = image.pixels().map(|(_, _, p)| p.0[3]).collect();
                    compress_to_vec_zlib(&alphas, level)
                });
                EncodeOutput {
                    filter: Filter::FlateDecode,
                    bytes: compress_to_vec_zlib(image.to_rgb8().as_raw(), level),
                    mask,
                }
            }
        }
    }

    pub(crate) fn write(
        &self,
        refs: &mut ObjectReferences,
        image_index: usize,
        writer: &mut Pdf,
    ) -> Result<(), EngineError> {
        match &self.data {
            ImageData::Raster(raster) => {
                let id = refs.get_or_gen(RefType::Image(image_index));
                let encoded = Self::encode_raster(raster);

                let mut image = writer.image_xobject(id, encoded.bytes.as_slice());
                image.filter(encoded.filter);
                image.width(self.width as i32);
                image.height(self.height as i32);
                image.color_space().device_rgb();
                image.bits_per_component(8);

                let mask_id = encoded
                    .mask
                    .as_ref()
                    .map(|_| refs.gen(RefType::ImageMask(image_index)));
                if let Some(mask_id) = mask_id {
                    image.s_mask(mask_id);
                }
                image.finish();

                if let (Some(mask_id), Some(mask)) = (mask_id, encoded.mask.as_ref()) {
                    let mut s_mask = writer.image_xobject(mask_id, mask.as_slice());
                    s_mask.filter(Filter::FlateDecode);
                    s_mask.width(self.width as i32);
                    s_mask.height(self.height as i32);
                    s_mask.color_space().device_gray();
                    s_mask.bits_per_component(8);
                }
            }
            ImageData::Svg(tree) => {
                let (chunk, root) =
                    svg2pdf::to_chunk(tree, svg2pdf::ConversionOptions::default())
                        .map_err(|e| EngineError::SvgConversion(e.to_string()))?;

                // move the converted objects into our id space
                let mut renumbered: HashMap<Ref, Ref> = HashMap::new();
                let chunk = chunk.renumber(|old| *renumbered.entry(old).or_insert_with(|| refs.bump()));
                let root = renumbered
                    .get(&root)
                    .copied()
                    .ok_or_else(|| EngineError::SvgConversion("converted SVG has no root object".into()))?;
                writer.extend(&chunk);
                refs.alias(RefType::Image(image_index), root);
            }
        }

        Ok(())
    }
}
