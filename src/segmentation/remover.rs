use super::compose::apply_matte;
use super::types::{FillPolicy, ModelKind, SegmentationModel};
use super::create_model;
use crate::error::SegmentationError;
use crate::scheduler::{FrameProcessor, WorkerFactory};
use image::ImageFormat;
use std::io::Cursor;
use std::path::PathBuf;

/// Remove the background from one encoded image.
///
/// Decodes `frame_bytes`, runs the model, applies `fill` and returns the
/// result as PNG. Touches no files.
pub fn remove_background(
    model: &mut dyn SegmentationModel,
    frame_bytes: &[u8],
    fill: FillPolicy,
) -> Result<Vec<u8>, SegmentationError> {
    let frame = image::load_from_memory(frame_bytes)
        .map_err(SegmentationError::Decode)?
        .to_rgb8();

    let matte = model.segment(&frame)?;
    let (width, height) = frame.dimensions();
    if matte.len() != (width as usize) * (height as usize) {
        return Err(SegmentationError::Model(format!(
            "matte has {} values for a {}x{} frame",
            matte.len(),
            width,
            height
        )));
    }

    let cutout = apply_matte(&frame, &matte, fill);

    let mut encoded = Cursor::new(Vec::new());
    cutout
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(SegmentationError::Encode)?;
    Ok(encoded.into_inner())
}

/// A worker's long-lived model session plus the run's fill policy
pub struct BackgroundRemover {
    model: Box<dyn SegmentationModel>,
    fill: FillPolicy,
}

impl BackgroundRemover {
    pub fn new(model: Box<dyn SegmentationModel>, fill: FillPolicy) -> Self {
        Self { model, fill }
    }
}

impl FrameProcessor for BackgroundRemover {
    fn process(&mut self, frame_bytes: &[u8]) -> Result<Vec<u8>, SegmentationError> {
        remove_background(self.model.as_mut(), frame_bytes, self.fill)
    }
}

/// Opens one ONNX session per worker, once, when the worker starts
#[derive(Debug, Clone)]
pub struct RemoverFactory {
    pub kind: ModelKind,
    pub model_path: PathBuf,
    pub intra_threads: usize,
    pub fill: FillPolicy,
}

impl WorkerFactory for RemoverFactory {
    fn create_worker(&self, worker_id: usize) -> Result<Box<dyn FrameProcessor>, SegmentationError> {
        tracing::debug!("Worker {} opening {} session", worker_id, self.kind);
        let model = create_model(self.kind, &self.model_path, self.intra_threads)?;
        Ok(Box::new(BackgroundRemover::new(model, self.fill)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Foreground wherever the red channel is bright
    struct RedIsForeground;

    impl SegmentationModel for RedIsForeground {
        fn segment(&mut self, frame: &RgbImage) -> Result<Vec<f32>, SegmentationError> {
            Ok(frame
                .pixels()
                .map(|p| if p[0] > 127 { 1.0 } else { 0.0 })
                .collect())
        }
    }

    struct ShortMatte;

    impl SegmentationModel for ShortMatte {
        fn segment(&mut self, _frame: &RgbImage) -> Result<Vec<f32>, SegmentationError> {
            Ok(vec![1.0])
        }
    }

    fn png(image: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn sample() -> Vec<u8> {
        png(&RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        }))
    }

    #[test]
    fn transparent_output_masks_background() {
        let out = remove_background(&mut RedIsForeground, &sample(), FillPolicy::Transparent)
            .unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0[3], 0);
    }

    #[test]
    fn solid_output_replaces_background() {
        let out = remove_background(&mut RedIsForeground, &sample(), FillPolicy::WHITE).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn same_input_gives_same_bytes() {
        let mut remover = BackgroundRemover::new(Box::new(RedIsForeground), FillPolicy::Transparent);
        let first = remover.process(&sample()).unwrap();
        let second = remover.process(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = remove_background(&mut RedIsForeground, b"not an image", FillPolicy::Transparent)
            .unwrap_err();
        assert!(matches!(err, SegmentationError::Decode(_)));
    }

    #[test]
    fn wrong_matte_size_is_a_model_error() {
        let err = remove_background(&mut ShortMatte, &sample(), FillPolicy::Transparent)
            .unwrap_err();
        assert!(matches!(err, SegmentationError::Model(_)));
    }

    #[test]
    fn factory_reports_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let factory = RemoverFactory {
            kind: ModelKind::U2net,
            model_path: dir.path().join("u2net.onnx"),
            intra_threads: 1,
            fill: FillPolicy::Transparent,
        };
        assert!(matches!(
            factory.create_worker(0),
            Err(SegmentationError::ModelMissing(_))
        ));
    }
}
