//! CPU pixel kernels over tightly packed premultiplied RGBA8 buffers.

use rayon::prelude::*;

use crate::{
    foundation::{
        color::Color,
        error::{CardError, CardResult},
        math::{mul_div255_u8, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place},
    },
    model::canvas::{GradientState, GradientType},
};

pub type PremulRgba8 = [u8; 4];

fn expected_len(width: u32, height: u32) -> CardResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CardError::validation("pixel buffer size overflow"))
}

fn check_len(buf: &[u8], width: u32, height: u32, what: &str) -> CardResult<usize> {
    let len = expected_len(width, height)?;
    if buf.len() != len {
        return Err(CardError::validation(format!(
            "{what} expects a buffer of width*height*4 bytes"
        )));
    }
    Ok(len)
}

/// Endpoints of a linear gradient across a `width x height` box.
///
/// `0°` runs left to right, `90°` top to bottom.
pub fn linear_gradient_endpoints(width: f64, height: f64, angle_deg: f64) -> [(f64, f64); 2] {
    let rad = if angle_deg.is_finite() {
        angle_deg.to_radians()
    } else {
        0.0
    };
    let (s, c) = rad.sin_cos();
    [
        (width * (0.5 - c * 0.5), height * (0.5 - s * 0.5)),
        (width * (0.5 + c * 0.5), height * (0.5 + s * 0.5)),
    ]
}

/// Rasterize a two-stop gradient. Colors interpolate in premultiplied space.
pub fn gradient_rgba8_premul(
    width: u32,
    height: u32,
    gradient: &GradientState,
) -> CardResult<Vec<u8>> {
    let len = expected_len(width, height)?;
    if len == 0 {
        return Ok(Vec::new());
    }
    let from = premul_f64(Color::parse_or(&gradient.color1, Color::WHITE));
    let to = premul_f64(Color::parse_or(&gradient.color2, Color::WHITE));
    let (w, h) = (f64::from(width), f64::from(height));

    let param: Box<dyn Fn(f64, f64) -> f64 + Sync> = match gradient.kind {
        GradientType::Linear => {
            let [(x1, y1), (x2, y2)] = linear_gradient_endpoints(w, h, gradient.angle);
            let (dx, dy) = (x2 - x1, y2 - y1);
            let len2 = dx * dx + dy * dy;
            Box::new(move |x, y| {
                if len2 <= f64::EPSILON {
                    return 0.0;
                }
                ((x - x1) * dx + (y - y1) * dy) / len2
            })
        }
        GradientType::Radial => {
            let (cx, cy) = (w / 2.0, h / 2.0);
            let radius = w.max(h) / 1.5;
            Box::new(move |x, y| ((x - cx).hypot(y - cy)) / radius)
        }
    };

    let mut out = vec![0u8; len];
    out.par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(row, line)| {
            let y = row as f64 + 0.5;
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let t = param(col as f64 + 0.5, y).clamp(0.0, 1.0);
                for c in 0..4 {
                    px[c] = (from[c] + (to[c] - from[c]) * t).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
    Ok(out)
}

fn premul_f64(color: Color) -> [f64; 4] {
    let a = color.a.clamp(0.0, 1.0);
    [
        color.r.clamp(0.0, 1.0) * a * 255.0,
        color.g.clamp(0.0, 1.0) * a * 255.0,
        color.b.clamp(0.0, 1.0) * a * 255.0,
        a * 255.0,
    ]
}

/// Separable gaussian blur. The kernel spans `ceil(3 * sigma)` pixels on each side, capped at the
/// larger image side; edges clamp.
pub fn blur_rgba8_premul(src: &[u8], width: u32, height: u32, sigma: f32) -> CardResult<Vec<u8>> {
    let len = check_len(src, width, height, "blur_rgba8_premul")?;
    if sigma.is_nan() || sigma <= 0.0 || len == 0 {
        return Ok(src.to_vec());
    }
    let radius = blur_radius(f64::from(sigma), width, height);
    let kernel = gaussian_kernel_q16(radius, f64::from(sigma))?;

    let mut tmp = vec![0u8; len];
    let mut out = vec![0u8; len];
    horizontal_pass(src, &mut tmp, width, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Taps past the larger image side only resample clamped edge pixels.
pub(crate) fn blur_radius(sigma: f64, width: u32, height: u32) -> u32 {
    let max = width.max(height);
    if !sigma.is_finite() {
        return max;
    }
    let r = (sigma * 3.0).ceil();
    if r >= f64::from(max) { max } else { r.max(0.0) as u32 }
}

fn gaussian_kernel_q16(radius: u32, sigma: f64) -> CardResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    let r = i64::from(radius);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(CardError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Fold rounding error into the center tap so the kernel sums to exactly 1.0.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let w = i64::from(width);
    let stride = width as usize * 4;
    dst.par_chunks_mut(stride)
        .zip(src.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i64 - radius).clamp(0, w - 1) as usize * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(in_row[sx + c]);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    out_row[o + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i64;
    let h = i64::from(height);
    let stride = width as usize * 4;
    dst.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..stride / 4 {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sy = (y as i64 + ki as i64 - radius).clamp(0, h - 1) as usize;
                    let idx = sy * stride + x * 4;
                    for c in 0..4 {
                        acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                    }
                }
                for c in 0..4 {
                    out_row[x * 4 + c] = q16_to_u8(acc[c]);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// Brightness then contrast, both in percent with 100 as neutral.
pub fn brightness_contrast_in_place(rgba8_premul: &mut [u8], brightness_pct: f64, contrast_pct: f64) {
    let b = if brightness_pct.is_finite() {
        (brightness_pct / 100.0).max(0.0)
    } else {
        1.0
    };
    let k = if contrast_pct.is_finite() {
        (contrast_pct / 100.0).max(0.0)
    } else {
        1.0
    };
    if b == 1.0 && k == 1.0 {
        return;
    }

    let lut: Vec<u8> = (0..=255u16)
        .map(|v| {
            let c = f64::from(v) / 255.0 * b;
            let c = (c - 0.5) * k + 0.5;
            (c.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect();

    unpremultiply_rgba8_in_place(rgba8_premul);
    rgba8_premul.par_chunks_mut(4).for_each(|px| {
        for c in &mut px[..3] {
            *c = lut[usize::from(*c)];
        }
    });
    premultiply_rgba8_in_place(rgba8_premul);
}

/// Resample to `dst_width x dst_height` with a triangle filter.
pub fn resize_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    dst_width: u32,
    dst_height: u32,
) -> CardResult<Vec<u8>> {
    check_len(src, width, height, "resize_rgba8_premul")?;
    if (width, height) == (dst_width, dst_height) {
        return Ok(src.to_vec());
    }
    if dst_width == 0 || dst_height == 0 {
        return Err(CardError::validation("resize target must be non-empty"));
    }
    let img = image::RgbaImage::from_raw(width, height, src.to_vec())
        .ok_or_else(|| CardError::validation("resize source buffer mismatch"))?;
    let resized = image::imageops::resize(
        &img,
        dst_width,
        dst_height,
        image::imageops::FilterType::Triangle,
    );
    Ok(resized.into_raw())
}

/// Source-over with an extra opacity multiplier.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }
    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite every pixel over an opaque `background`, leaving a fully opaque buffer.
pub fn flatten_onto_in_place(rgba8_premul: &mut [u8], background: [u8; 3]) {
    let bg = [background[0], background[1], background[2], 255];
    rgba8_premul.par_chunks_mut(4).for_each(|px| {
        let out = over(bg, [px[0], px[1], px[2], px[3]], 1.0);
        px.copy_from_slice(&out);
    });
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
