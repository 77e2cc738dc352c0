//! Logo and background preparation.
//!
//! Both asset kinds are decoded once into premultiplied RGBA8 buffers sized for their
//! role: logos keep their aspect ratio (SVGs rasterized at a fixed long edge), the
//! background is cover-scaled onto the canvas and optionally pre-blurred.

mod decode;

use std::path::Path;
use std::sync::Arc;

use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::render::blur::gaussian_blur_premul;

/// Raster size for SVG logos. Logos draw inside a 120 px box at unit scale, so this
/// leaves headroom for the largest layout scale without blurry upsampling.
const LOGO_RASTER_LONG_EDGE: u32 = 512;

/// A decoded image ready for compositing: premultiplied RGBA8, row-major, tightly packed.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` premultiplied RGBA bytes.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Load a logo from disk. `.svg` files are rasterized; everything else goes through the
/// raster image decoder.
#[tracing::instrument]
pub fn load_logo(path: &Path) -> AudiogramResult<PreparedImage> {
    let bytes = read_asset(path)?;
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        decode::rasterize_svg(&bytes, path.parent(), LOGO_RASTER_LONG_EDGE)
    } else {
        decode::decode_image(&bytes)
    }
}

/// Load a background image and fit it to `canvas`: cover-scale, center-crop, premultiply,
/// and blur with `blur_sigma` if given. The blur runs here, once, because it does not
/// depend on playback time.
#[tracing::instrument(skip(blur_sigma))]
pub fn prepare_background(
    path: &Path,
    canvas: Canvas,
    blur_sigma: Option<f64>,
) -> AudiogramResult<PreparedImage> {
    let bytes = read_asset(path)?;
    prepare_background_from_bytes(&bytes, canvas, blur_sigma)
}

/// [`prepare_background`] on in-memory encoded bytes.
pub fn prepare_background_from_bytes(
    bytes: &[u8],
    canvas: Canvas,
    blur_sigma: Option<f64>,
) -> AudiogramResult<PreparedImage> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(AudiogramError::validation("canvas must be non-empty"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| AudiogramError::media(format!("decode background image: {e}")))?;
    let fitted = dyn_img.resize_to_fill(
        canvas.width,
        canvas.height,
        image::imageops::FilterType::Triangle,
    );
    let rgba = fitted.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    decode::premultiply_rgba8_in_place(&mut rgba8_premul);

    if let Some(sigma) = blur_sigma
        && sigma > 0.0
    {
        rgba8_premul = gaussian_blur_premul(&rgba8_premul, width, height, sigma)?;
    }

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn read_asset(path: &Path) -> AudiogramResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| AudiogramError::media(format!("read asset '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "audiogram_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn png_bytes(width: u32, height: u32, fill: [u8; 4]) -> Vec<u8> {
        let raw: Vec<u8> = fill
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        let img = image::RgbaImage::from_raw(width, height, raw).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn background_is_cover_cropped_to_canvas() {
        // Wider than the target aspect: cover scaling crops the sides, not the height.
        let bytes = png_bytes(8, 2, [10, 20, 30, 255]);
        let canvas = Canvas {
            width: 4,
            height: 2,
        };
        let prepared = prepare_background_from_bytes(&bytes, canvas, None).unwrap();
        assert_eq!((prepared.width, prepared.height), (4, 2));
        assert_eq!(prepared.rgba8_premul.len(), 4 * 2 * 4);
        assert_eq!(&prepared.rgba8_premul[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn blur_changes_non_constant_backgrounds() {
        let mut raw = vec![0u8; 8 * 8 * 4];
        for px in raw.chunks_exact_mut(4).take(32) {
            px.copy_from_slice(&[255, 255, 255, 255]);
        }
        for px in raw.chunks_exact_mut(4).skip(32) {
            px[3] = 255;
        }
        let img = image::RgbaImage::from_raw(8, 8, raw).unwrap();
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let canvas = Canvas {
            width: 8,
            height: 8,
        };
        let sharp = prepare_background_from_bytes(&bytes, canvas, None).unwrap();
        let soft = prepare_background_from_bytes(&bytes, canvas, Some(2.0)).unwrap();
        assert_ne!(sharp.rgba8_premul, soft.rgba8_premul);
    }

    #[test]
    fn logo_dispatches_on_extension() {
        let tmp = temp_dir("assets_logo_dispatch");
        std::fs::create_dir_all(&tmp).unwrap();

        let png_path = tmp.join("logo.png");
        std::fs::write(&png_path, png_bytes(2, 2, [1, 2, 3, 255])).unwrap();
        let png_logo = load_logo(&png_path).unwrap();
        assert_eq!((png_logo.width, png_logo.height), (2, 2));

        let svg_path = tmp.join("logo.SVG");
        std::fs::write(
            &svg_path,
            br##"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="1">
                <rect width="2" height="1" fill="#00ff00"/>
            </svg>"##,
        )
        .unwrap();
        let svg_logo = load_logo(&svg_path).unwrap();
        assert_eq!(
            (svg_logo.width, svg_logo.height),
            (LOGO_RASTER_LONG_EDGE, LOGO_RASTER_LONG_EDGE / 2)
        );

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_asset_is_a_media_error() {
        let err = load_logo(Path::new("/no/such/logo.png")).unwrap_err();
        assert!(err.to_string().contains("media load error"));
    }
}
