use std::path::Path;
use std::sync::Arc;

use crate::assets::PreparedImage;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::foundation::math::mul_div255_u8;

pub(crate) fn decode_image(bytes: &[u8]) -> AudiogramResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| AudiogramError::media(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse an SVG and rasterize it with a uniform scale so its longer edge lands on
/// `long_edge_px`. The output is premultiplied RGBA8, matching [`PreparedImage`].
pub(crate) fn rasterize_svg(
    bytes: &[u8],
    resources_dir: Option<&Path>,
    long_edge_px: u32,
) -> AudiogramResult<PreparedImage> {
    let fontdb = {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Arc::new(db)
    };
    let opts = usvg::Options {
        resources_dir: resources_dir.map(|p| p.to_path_buf()),
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(bytes, &opts)
        .map_err(|e| AudiogramError::media(format!("parse svg: {e}")))?;

    let size = tree.size();
    if !size.width().is_finite()
        || !size.height().is_finite()
        || size.width() <= 0.0
        || size.height() <= 0.0
    {
        return Err(AudiogramError::media("svg has invalid width/height"));
    }

    let scale = (long_edge_px.max(1) as f32) / size.width().max(size.height());
    let width = ((size.width() * scale).ceil() as u32).max(1);
    let height = ((size.height() * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| AudiogramError::media("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(
        (width as f32) / size.width(),
        (height as f32) / size.height(),
    );
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u8(px[0] as u16, a);
        px[1] = mul_div255_u8(px[1] as u16, a);
        px[2] = mul_div255_u8(px[2] as u16, a);
    }
}
