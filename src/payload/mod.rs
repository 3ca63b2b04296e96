//! Synthetic image payloads.

pub mod canvas;
pub mod encoder;

use serde::Serialize;

use crate::payload::canvas::dimension_label;

/// What a client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSpec {
    /// Fixed canvas size, fixed quality.
    Dimensions { width: u32, height: u32 },
    /// Default canvas, quality searched toward this size.
    TargetSize { target_kb: u32 },
}

impl PayloadSpec {
    /// The log label for this request. Exactly one variant is ever set.
    pub fn label(&self) -> PayloadLabel {
        match self {
            PayloadSpec::Dimensions { width, height } => {
                PayloadLabel::Dimensions(dimension_label(*width, *height))
            }
            PayloadSpec::TargetSize { target_kb } => PayloadLabel::TargetSizeKb(*target_kb),
        }
    }

    /// File name suggested to clients.
    pub fn file_name(&self) -> String {
        match self {
            PayloadSpec::Dimensions { width, height } => {
                format!("test_image_{}x{}.jpg", width, height)
            }
            PayloadSpec::TargetSize { target_kb } => format!("test_image_{}kb.jpg", target_kb),
        }
    }
}

/// Generation mode recorded with each transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PayloadLabel {
    #[serde(rename = "dimensions")]
    Dimensions(String),
    #[serde(rename = "target_size_kb")]
    TargetSizeKb(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_request_kind() {
        let dims = PayloadSpec::Dimensions {
            width: 1920,
            height: 1080,
        };
        assert_eq!(dims.label(), PayloadLabel::Dimensions("1920x1080".to_string()));
        assert_eq!(dims.file_name(), "test_image_1920x1080.jpg");

        let sized = PayloadSpec::TargetSize { target_kb: 100 };
        assert_eq!(sized.label(), PayloadLabel::TargetSizeKb(100));
        assert_eq!(sized.file_name(), "test_image_100kb.jpg");
    }
}
