//! Separable Gaussian blur over premultiplied RGBA8, in Q16 fixed point.
//!
//! Used once per project load to soften the background image; the blurred buffer is
//! then reused for every preview and export frame.

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Largest supported kernel radius. Blur amounts are small UI values; anything beyond
/// this is clamped rather than rejected.
const MAX_RADIUS: u32 = 255;

/// Blur `src` (premultiplied RGBA8, `width * height * 4` bytes) with a Gaussian of the
/// given sigma. `sigma <= 0` is the identity. The kernel covers three sigmas per side.
pub(crate) fn gaussian_blur_premul(
    src: &[u8],
    width: u32,
    height: u32,
    sigma: f64,
) -> AudiogramResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| AudiogramError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(AudiogramError::validation(
            "blur input must be width*height*4 bytes",
        ));
    }
    if !sigma.is_finite() {
        return Err(AudiogramError::validation("blur sigma must be finite"));
    }
    if sigma <= 0.0 || width == 0 || height == 0 {
        return Ok(src.to_vec());
    }

    let radius = ((sigma * 3.0).ceil() as u32).clamp(1, MAX_RADIUS);
    let kernel = gaussian_kernel_q16(radius, sigma);

    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    separable_pass(src, &mut tmp, width, height, &kernel, Axis::Horizontal);
    separable_pass(&tmp, &mut out, width, height, &kernel, Axis::Vertical);
    Ok(out)
}

/// Normalized Gaussian weights in Q16. The rounding residue is folded into the center
/// tap so the weights always sum to exactly 65536.
fn gaussian_kernel_q16(radius: u32, sigma: f64) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r).map(|i| (-(i * i) as f64 / denom).exp()).collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights = Vec::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as i64;
        weights.push(q as u32);
        acc += q;
    }
    let mid = weights.len() / 2;
    let corrected = (i64::from(weights[mid]) + (65536 - acc)).clamp(0, 65536);
    weights[mid] = corrected as u32;
    weights
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn separable_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    // Edge taps clamp to the border pixel.
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let offset = ki as i32 - radius;
                let (sx, sy) = match axis {
                    Axis::Horizontal => ((x + offset).clamp(0, w - 1), y),
                    Axis::Vertical => (x, (y + offset).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_is_identity() {
        let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let out = gaussian_blur_premul(&src, 1, 2, 0.0).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let (w, h) = (4u32, 3u32);
        let px = [10u8, 20u8, 30u8, 40u8];
        let src = px.repeat((w * h) as usize);
        let out = gaussian_blur_premul(&src, w, h, 2.0).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn single_pixel_spreads_but_conserves_energy() {
        let (w, h) = (9u32, 9u32);
        let mut src = vec![0u8; (w * h * 4) as usize];
        let center = ((4 * w + 4) * 4) as usize;
        src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

        let out = gaussian_blur_premul(&src, w, h, 1.2).unwrap();

        let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
        assert!(nonzero > 1);

        let sum_a: u32 = out.chunks_exact(4).map(|px| u32::from(px[3])).sum();
        assert!((sum_a as i32 - 255).abs() <= 4);
    }

    #[test]
    fn rejects_wrong_buffer_size_and_nan_sigma() {
        assert!(gaussian_blur_premul(&[0u8; 5], 1, 1, 1.0).is_err());
        assert!(gaussian_blur_premul(&[0u8; 4], 1, 1, f64::NAN).is_err());
    }
}
