use image::{imageops, RgbImage};
use ndarray::Array4;

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            target_width,
            target_height,
            mean,
            std,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Scale by the brightest channel value so the image spans [0, 1]
    /// 3. Subtract mean and divide by std per channel
    /// 4. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };

        let max = resized.as_raw().iter().copied().max().unwrap_or(0).max(1) as f32;

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / max;
                tensor[[0, c, y as usize, x as usize]] = (value - self.mean[c]) / self.std[c];
            }
        }

        tensor
    }

    /// Turn raw model output into a matte at the original frame size
    ///
    /// The prediction is min-max normalized to [0, 1] first; a constant
    /// prediction becomes an all-background matte.
    ///
    /// Returns: Resized matte flattened in row-major order
    pub fn postprocess_matte(
        prediction: &[f32],
        matte_width: u32,
        matte_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Vec<f32> {
        let _span = tracing::debug_span!("postprocess").entered();

        let (min, max) = prediction
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let normalized: Vec<f32> = if range > f32::EPSILON {
            prediction.iter().map(|v| (v - min) / range).collect()
        } else {
            vec![0.0; prediction.len()]
        };

        if matte_width == target_width && matte_height == target_height {
            return normalized;
        }

        let gray_image = image::GrayImage::from_fn(matte_width, matte_height, |x, y| {
            let idx = (y * matte_width + x) as usize;
            image::Luma([(normalized[idx] * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        let resized = imageops::resize(
            &gray_image,
            target_width,
            target_height,
            imageops::FilterType::Lanczos3,
        );

        resized.pixels().map(|p| p[0] as f32 / 255.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_scales_by_brightest_channel() {
        let image = RgbImage::from_fn(2, 2, |x, _| {
            if x == 0 {
                image::Rgb([100, 50, 0])
            } else {
                image::Rgb([0, 0, 0])
            }
        });
        let pre = Preprocessor::new(2, 2, [0.0; 3], [1.0; 3]);
        let tensor = pre.preprocess(&image);

        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 1, 0]] - 0.5).abs() < 1e-6);
        assert_eq!(tensor[[0, 2, 0, 1]], 0.0);
    }

    #[test]
    fn preprocess_resizes_to_model_input() {
        let image = RgbImage::new(64, 48);
        let pre = Preprocessor::new(32, 32, [0.485, 0.456, 0.406], [0.229, 0.224, 0.225]);
        assert_eq!(pre.preprocess(&image).shape(), &[1, 3, 32, 32]);
    }

    #[test]
    fn postprocess_normalizes_range() {
        let matte = Preprocessor::postprocess_matte(&[2.0, 4.0, 6.0, 4.0], 2, 2, 2, 2);
        assert_eq!(matte, vec![0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn postprocess_constant_prediction_is_background() {
        let matte = Preprocessor::postprocess_matte(&[0.7; 4], 2, 2, 4, 3);
        assert_eq!(matte.len(), 12);
        assert!(matte.iter().all(|&v| v == 0.0));
    }
}
