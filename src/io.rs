use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageError, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::info;

use crate::canvas::{Bitmap, CanvasStyle, PixelStore};
use crate::error::{EngineError, Result};

/// Output encodings, chosen from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Bmp,
    Tga,
    Webp,
    Tiff,
    Ico,
}

impl SaveFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            "tga" => Some(Self::Tga),
            "webp" => Some(Self::Webp),
            "tif" | "tiff" => Some(Self::Tiff),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tga => "tga",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
            Self::Ico => "ico",
        }
    }
}

// ============================================================================
// RGBA <-> BITMAP
// ============================================================================

/// Copy a decoded image into a new canvas with an `overscroll` margin.
pub fn bitmap_from_rgba(img: &RgbaImage, overscroll: i32, style: &CanvasStyle) -> Bitmap {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let mut bmp = Bitmap::with_overscroll(w, h, overscroll, style);
    let (cl, ct) = (bmp.cl(), bmp.ct());
    let stride = bmp.w as usize;
    let data = bmp.data_mut();
    for (y, row) in img.rows().enumerate() {
        let start = (ct as usize + y) * stride + cl as usize;
        for (dst, px) in data[start..start + w as usize].iter_mut().zip(row) {
            *dst = u32::from_le_bytes(px.0);
        }
    }
    bmp
}

/// The clip region as an `RgbaImage`.
pub fn bitmap_to_rgba<S: PixelStore>(bmp: &Bitmap<S>) -> RgbaImage {
    let mut img = RgbaImage::new(bmp.cw() as u32, bmp.ch() as u32);
    let (cl, ct) = (bmp.cl(), bmp.ct());
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgba(bmp.getpixel(cl + x as i32, ct + y as i32).to_le_bytes());
    }
    img
}

// ============================================================================
// LOAD / SAVE
// ============================================================================

/// Decode any format the `image` crate understands into a canvas.
pub fn load_bitmap(path: &Path, overscroll: i32, style: &CanvasStyle) -> Result<Bitmap> {
    let img = image::open(path)
        .map_err(|e| EngineError::image(path, e))?
        .to_rgba8();
    info!("io: loaded {} ({}x{})", path.display(), img.width(), img.height());
    Ok(bitmap_from_rgba(&img, overscroll, style))
}

/// Encode the clip region. The format follows the extension (PNG when
/// there is none); `quality` only applies to JPEG.
pub fn save_bitmap<S: PixelStore>(bmp: &Bitmap<S>, path: &Path, quality: u8) -> Result<()> {
    let format = SaveFormat::from_path(path).unwrap_or(SaveFormat::Png);
    let image = bitmap_to_rgba(bmp);
    encode_and_write(&image, path, format, quality).map_err(|e| EngineError::image(path, e))?;
    info!("io: wrote {} ({}x{}, {:?})", path.display(), image.width(), image.height(), format);
    Ok(())
}

pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb_image.as_raw(), rgb_image.width(), rgb_image.height(), image::ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)?;
        }
        SaveFormat::Webp | SaveFormat::Tiff => {
            drop(writer);
            DynamicImage::ImageRgba8(image.clone()).save(path)?;
        }
        SaveFormat::Ico => {
            // ICO entries limited to 256×256; scale down if needed
            let dyn_img = if image.width() > 256 || image.height() > 256 {
                let scale = 256.0 / image.width().max(image.height()) as f32;
                let new_w = ((image.width() as f32 * scale) as u32).max(1);
                let new_h = ((image.height() as f32 * scale) as u32).max(1);
                let resized = image::imageops::resize(image, new_w, new_h, image::imageops::FilterType::Lanczos3);
                DynamicImage::ImageRgba8(resized)
            } else {
                DynamicImage::ImageRgba8(image.clone())
            };
            dyn_img.write_to(&mut writer, image::ImageOutputFormat::Ico)?;
        }
    }

    Ok(())
}
