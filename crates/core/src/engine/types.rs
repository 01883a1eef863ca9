//! Types exchanged with an engine.

use serde::{Deserialize, Serialize};

/// A single conversion handed to the engine.
///
/// The engine takes ownership of `input_bytes`; the names only carry the
/// container extensions and are never used as paths.
#[derive(Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    /// Name of the source file (its extension selects the demuxer).
    pub input_name: String,
    /// Raw source payload.
    pub input_bytes: Vec<u8>,
    /// Name of the artifact to produce (its extension selects the muxer).
    pub output_name: String,
}

impl std::fmt::Debug for ConvertRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertRequest")
            .field("input_name", &self.input_name)
            .field("input_len", &self.input_bytes.len())
            .field("output_name", &self.output_name)
            .finish()
    }
}

/// Progress tick reported while a conversion runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineProgress {
    /// Completion ratio as reported by the engine. Nominally 0.0 - 1.0 but
    /// not guaranteed to stay in range or to be monotonic.
    pub ratio: f64,
}

impl EngineProgress {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    /// Converts the ratio to a whole percentage clamped to 0 - 100.
    ///
    /// Returns `None` for NaN or infinite ratios.
    pub fn percent(&self) -> Option<u8> {
        if !self.ratio.is_finite() {
            return None;
        }
        Some((self.ratio.clamp(0.0, 1.0) * 100.0).round() as u8)
    }
}
