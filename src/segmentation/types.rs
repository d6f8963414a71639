use crate::error::SegmentationError;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Alpha matte: grayscale values where 0.0 = background, 1.0 = foreground
/// Dimensions match the input frame dimensions
pub type Matte = Vec<f32>;

/// Trait for segmentation models
/// Allows swapping the ONNX backend for anything that produces a matte
pub trait SegmentationModel {
    /// Process a frame and return an alpha matte
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * Alpha matte with values 0.0-1.0, flattened in row-major order
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte, SegmentationError>;
}

/// What replaces removed background pixels. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Matte becomes the alpha channel
    Transparent,
    /// Foreground blended over an opaque color
    Solid([u8; 3]),
}

impl FillPolicy {
    pub const WHITE: Self = Self::Solid([255, 255, 255]);
}

impl FromStr for FillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transparent" | "none" => Ok(Self::Transparent),
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::Solid([0, 0, 0])),
            other => {
                let hex = other
                    .strip_prefix('#')
                    .ok_or_else(|| format!("unknown fill policy '{s}'"))?;
                if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(format!("expected #rrggbb, got '{s}'"));
                }
                let channel = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string())
                };
                Ok(Self::Solid([channel(0)?, channel(2)?, channel(4)?]))
            }
        }
    }
}

impl fmt::Display for FillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str("transparent"),
            Self::Solid([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

/// Pretrained background segmentation models loadable from the model home
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelKind {
    #[value(name = "u2net")]
    U2net,
    #[value(name = "u2netp")]
    U2netp,
    #[value(name = "u2net_human_seg")]
    U2netHumanSeg,
    #[value(name = "silueta")]
    Silueta,
    #[value(name = "isnet-general-use")]
    IsnetGeneralUse,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::U2net => "u2net",
            Self::U2netp => "u2netp",
            Self::U2netHumanSeg => "u2net_human_seg",
            Self::Silueta => "silueta",
            Self::IsnetGeneralUse => "isnet-general-use",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.name())
    }

    /// Square input resolution the network was trained at
    pub fn input_size(&self) -> (u32, u32) {
        match self {
            Self::IsnetGeneralUse => (1024, 1024),
            _ => (320, 320),
        }
    }

    /// Per-channel (mean, std) applied after max scaling
    pub fn normalization(&self) -> ([f32; 3], [f32; 3]) {
        match self {
            Self::IsnetGeneralUse => ([0.5, 0.5, 0.5], [1.0, 1.0, 1.0]),
            _ => ([0.485, 0.456, 0.406], [0.229, 0.224, 0.225]),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
