mod compose;
mod preprocess;
mod remover;
pub mod types;
mod u2net;

pub use compose::apply_matte;
pub use preprocess::Preprocessor;
pub use remover::{remove_background, BackgroundRemover, RemoverFactory};
pub use types::{FillPolicy, Matte, ModelKind, SegmentationModel};
pub use u2net::U2Net;

use crate::error::SegmentationError;
use std::path::Path;

/// Load the ONNX session for `kind` from `model_path`
pub fn create_model(
    kind: ModelKind,
    model_path: &Path,
    intra_threads: usize,
) -> Result<Box<dyn SegmentationModel>, SegmentationError> {
    let model = U2Net::new(kind, model_path, intra_threads)?;
    Ok(Box::new(model))
}
