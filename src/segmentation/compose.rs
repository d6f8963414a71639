use super::types::FillPolicy;
use image::{Rgba, RgbImage, RgbaImage};

/// Combine a frame with its matte according to the fill policy.
///
/// `matte` must hold one value per pixel in row-major order.
pub fn apply_matte(frame: &RgbImage, matte: &[f32], fill: FillPolicy) -> RgbaImage {
    let (width, height) = frame.dimensions();
    debug_assert_eq!(matte.len(), (width * height) as usize);

    RgbaImage::from_fn(width, height, |x, y| {
        let alpha = matte[(y * width + x) as usize].clamp(0.0, 1.0);
        let [r, g, b] = frame.get_pixel(x, y).0;

        match fill {
            FillPolicy::Transparent => Rgba([r, g, b, to_u8(alpha)]),
            FillPolicy::Solid(bg) => {
                let blend = |fg: u8, bg: u8| {
                    (fg as f32 * alpha + bg as f32 * (1.0 - alpha))
                        .round()
                        .clamp(0.0, 255.0) as u8
                };
                Rgba([blend(r, bg[0]), blend(g, bg[1]), blend(b, bg[2]), 255])
            }
        }
    })
}

fn to_u8(unit: f32) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_pixel_frame() -> RgbImage {
        RgbImage::from_fn(2, 1, |_, _| Rgb([200, 100, 0]))
    }

    #[test]
    fn transparent_fill_moves_matte_into_alpha() {
        let out = apply_matte(&two_pixel_frame(), &[1.0, 0.0], FillPolicy::Transparent);
        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 100, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([200, 100, 0, 0]));
    }

    #[test]
    fn solid_fill_is_opaque_blend() {
        let out = apply_matte(&two_pixel_frame(), &[1.0, 0.5], FillPolicy::WHITE);
        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 100, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([228, 178, 128, 255]));
    }
}
