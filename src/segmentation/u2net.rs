use super::preprocess::Preprocessor;
use super::types::{Matte, ModelKind, SegmentationModel};
use crate::error::SegmentationError;
use image::RgbImage;
use ndarray::{s, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::fmt::Display;
use std::path::Path;

fn model_err<E: Display>(err: E) -> SegmentationError {
    SegmentationError::Model(err.to_string())
}

/// U²-Net family salient object segmentation (u2net, u2netp,
/// u2net_human_seg, silueta) and IS-Net, run through ONNX Runtime.
///
/// Stateless between frames, so one session can process frames in any
/// order. `Session::run` needs `&mut self`, so each worker owns its own.
pub struct U2Net {
    session: Session,
    preprocessor: Preprocessor,
    kind: ModelKind,
}

impl U2Net {
    /// Load a model from an ONNX file
    ///
    /// # Arguments
    /// * `kind` - Which variant the file holds (decides input size and normalization)
    /// * `model_path` - Path to the ONNX model file
    /// * `intra_threads` - ONNX Runtime intra-op threads for this session
    pub fn new<P: AsRef<Path>>(
        kind: ModelKind,
        model_path: P,
        intra_threads: usize,
    ) -> Result<Self, SegmentationError> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(SegmentationError::ModelMissing(path.to_path_buf()));
        }

        tracing::info!("Loading {} model from {}", kind, path.display());

        let session = Session::builder()
            .map_err(model_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_err)?
            .with_intra_threads(intra_threads.max(1))
            .map_err(model_err)?
            .commit_from_file(path)
            .map_err(|e| {
                SegmentationError::Model(format!("failed to load {}: {e}", path.display()))
            })?;

        tracing::debug!("{} session ready", kind);

        let (width, height) = kind.input_size();
        let (mean, std) = kind.normalization();

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height, mean, std),
            kind,
        })
    }
}

impl SegmentationModel for U2Net {
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte, SegmentationError> {
        let _span = tracing::debug_span!("u2net_segment", model = %self.kind).entered();

        let input = Tensor::from_array(self.preprocessor.preprocess(frame)).map_err(model_err)?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(model_err)?;
        drop(_infer_span);

        // First output is the fused side output d0, shape [1, 1, H, W]
        let prediction = outputs[0]
            .try_extract_array::<f32>()
            .map_err(model_err)?
            .into_dimensionality::<Ix4>()?;
        let (batch, channels, matte_height, matte_width) = prediction.dim();
        if batch == 0 || channels == 0 {
            return Err(SegmentationError::Model(format!(
                "empty prediction of shape {:?}",
                prediction.shape()
            )));
        }

        let raw: Vec<f32> = prediction
            .slice(s![0, 0, .., ..])
            .iter()
            .copied()
            .collect();

        let (frame_width, frame_height) = frame.dimensions();
        Ok(Preprocessor::postprocess_matte(
            &raw,
            matte_width as u32,
            matte_height as u32,
            frame_width,
            frame_height,
        ))
    }
}
