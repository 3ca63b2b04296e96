//! JPEG encoding with a bounded quality search.
//!
//! Dimension requests are encoded once at a fixed quality. Target-size
//! requests walk the quality down in fixed steps until the output fits the
//! tolerance window or the quality floor is reached, so the number of
//! encodes is bounded by [`QualitySearch::max_attempts`].

use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use rand::Rng;
use serde::Serialize;

use crate::config::types::EncoderConfig;
use crate::error::SpeedError;
use crate::payload::canvas::render_canvas;
use crate::payload::PayloadSpec;

const BYTES_PER_KB: f64 = 1024.0;

/// Parameters of the descending quality search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySearch {
    pub start_quality: u8,
    pub step: u8,
    pub min_quality: u8,
    /// Accepted size as a multiple of the target.
    pub tolerance: f64,
}

impl Default for QualitySearch {
    fn default() -> Self {
        EncoderConfig::default().search()
    }
}

impl QualitySearch {
    pub fn validate(&self) -> Result<(), SpeedError> {
        if self.step == 0 {
            return Err(SpeedError::Config(
                "encoder.quality_step must be greater than 0".to_string(),
            ));
        }
        if self.min_quality == 0
            || self.min_quality > self.start_quality
            || self.start_quality > 100
        {
            return Err(SpeedError::Config(format!(
                "encoder qualities must satisfy 1 <= min ({}) <= start ({}) <= 100",
                self.min_quality, self.start_quality
            )));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(SpeedError::Config(
                "encoder.tolerance must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Quality levels tried, highest first. Never yields below `min_quality`.
    pub fn qualities(&self) -> impl Iterator<Item = u8> {
        let step = self.step.max(1);
        let floor = self.min_quality;
        std::iter::successors(Some(self.start_quality), move |q| {
            q.checked_sub(step).filter(|next| *next >= floor)
        })
    }

    pub fn max_attempts(&self) -> usize {
        usize::from(self.start_quality.saturating_sub(self.min_quality) / self.step.max(1)) + 1
    }

    /// Largest accepted payload for a target, in bytes.
    pub fn byte_limit(&self, target_kb: u32) -> u64 {
        (f64::from(target_kb) * BYTES_PER_KB * self.tolerance).floor() as u64
    }
}

/// How an encoding was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Dimension request, single encode.
    Fixed,
    /// Output fit within the tolerance window.
    TargetMet { attempts: usize },
    /// Every quality overshot; the smallest output is returned.
    FloorReached { attempts: usize },
}

/// An encoded JPEG and how it was produced.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub outcome: SearchOutcome,
    pub elapsed_ms: u64,
}

impl EncodedPayload {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Produces JPEG payloads for [`PayloadSpec`] requests.
#[derive(Debug, Clone)]
pub struct PayloadEncoder {
    config: EncoderConfig,
}

impl Default for PayloadEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

impl PayloadEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Check a request without doing any work.
    pub fn validate(&self, spec: &PayloadSpec) -> Result<(), SpeedError> {
        let (width, height) = self.canvas_size(spec);
        if let PayloadSpec::TargetSize { target_kb } = spec {
            if *target_kb == 0 {
                return Err(SpeedError::InvalidRequest(
                    "target size must be greater than 0 KB".to_string(),
                ));
            }
        }
        if width == 0 || height == 0 {
            return Err(SpeedError::InvalidRequest(format!(
                "dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let max = self.config.max_dimension;
        if width > max || height > max {
            return Err(SpeedError::InvalidRequest(format!(
                "dimensions {}x{} exceed the {} pixel limit",
                width, height, max
            )));
        }
        Ok(())
    }

    /// Generate a payload using the thread-local RNG.
    pub fn generate(&self, spec: &PayloadSpec) -> Result<EncodedPayload, SpeedError> {
        self.generate_with_rng(spec, &mut rand::rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        spec: &PayloadSpec,
        rng: &mut R,
    ) -> Result<EncodedPayload, SpeedError> {
        self.validate(spec)?;
        let started = Instant::now();
        let (width, height) = self.canvas_size(spec);
        let canvas = render_canvas(width, height, rng);

        let (bytes, quality, outcome) = match spec {
            PayloadSpec::Dimensions { .. } => {
                let quality = self.config.fixed_quality;
                (encode_jpeg(&canvas, quality)?, quality, SearchOutcome::Fixed)
            }
            PayloadSpec::TargetSize { target_kb } => {
                encode_to_target(&canvas, *target_kb, &self.config.search())?
            }
        };

        let payload = EncodedPayload {
            bytes,
            width,
            height,
            quality,
            outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            width,
            height,
            quality,
            size = payload.size(),
            outcome = ?payload.outcome,
            "Payload encoded"
        );
        Ok(payload)
    }

    fn canvas_size(&self, spec: &PayloadSpec) -> (u32, u32) {
        match spec {
            PayloadSpec::Dimensions { width, height } => (*width, *height),
            PayloadSpec::TargetSize { .. } => {
                (self.config.default_width, self.config.default_height)
            }
        }
    }
}

/// Encode the canvas once at the given quality.
pub fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>, SpeedError> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode_image(canvas)?;
    }
    Ok(buf)
}

/// Walk the quality ladder until the output fits `target_kb` within tolerance.
pub fn encode_to_target(
    canvas: &RgbImage,
    target_kb: u32,
    search: &QualitySearch,
) -> Result<(Vec<u8>, u8, SearchOutcome), SpeedError> {
    search.validate()?;
    let limit = search.byte_limit(target_kb);
    let mut smallest: Option<(Vec<u8>, u8)> = None;
    let mut attempts = 0;

    for quality in search.qualities().take(search.max_attempts()) {
        attempts += 1;
        let bytes = encode_jpeg(canvas, quality)?;
        tracing::trace!(quality, size = bytes.len(), limit, "Quality attempt");

        if bytes.len() as u64 <= limit {
            return Ok((bytes, quality, SearchOutcome::TargetMet { attempts }));
        }
        let is_smaller = smallest
            .as_ref()
            .map_or(true, |(best, _)| bytes.len() < best.len());
        if is_smaller {
            smallest = Some((bytes, quality));
        }
    }

    let (bytes, quality) = smallest.ok_or_else(|| {
        SpeedError::Encoding("quality search produced no output".to_string())
    })?;
    tracing::debug!(
        target_kb,
        size = bytes.len(),
        "Quality floor reached before target size"
    );
    Ok((bytes, quality, SearchOutcome::FloorReached { attempts }))
}
