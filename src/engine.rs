//! Embedding and extraction over a whole luminance matrix.
//!
//! The luminance matrix is zero-centred (`Y - 128`, see
//! [`colorspace`](crate::colorspace)). One Haar level splits it into four
//! sub-bands, the message goes into every full tile of `HL`, and the inverse
//! transform puts the luminance back together.

use std::sync::Arc;

use crate::bitstream::{self, BitStream, Frame};
use crate::consensus::{self, Consensus};
use crate::dct::BlockDct;
use crate::dwt;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::qim::DEFAULT_DELTA;
use crate::tile::{self, TileIndex, MAX_MESSAGE_BYTES};
use crate::trace::{Event, Flag, NoopObserver, Observer};

/// Parameters shared by embedding and extraction. Both sides must agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkConfig {
    /// QIM quantization step.
    pub delta: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
        }
    }
}

/// What one tile yielded on extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct TileResult {
    pub index: TileIndex,
    pub bits: BitStream,
    pub frame: Option<Frame>,
}

#[derive(Clone)]
pub struct WatermarkEngine {
    config: WatermarkConfig,
    dct: BlockDct,
    observer: Arc<dyn Observer>,
}

impl Default for WatermarkEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WatermarkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WatermarkEngine {
    pub fn new() -> Self {
        Self::with_config(WatermarkConfig::default())
    }

    pub fn with_config(config: WatermarkConfig) -> Self {
        Self {
            config,
            dct: BlockDct::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Returns a watermarked copy of `luma`.
    ///
    /// Messages over [`MAX_MESSAGE_BYTES`] are embedded truncated, and a
    /// matrix too small for a single tile comes back unmarked; both cases
    /// are logged, not rejected.
    pub fn embed(&self, luma: &Matrix, message: &str) -> Result<Matrix> {
        if message.len() > MAX_MESSAGE_BYTES {
            tracing::warn!(
                bytes = message.len(),
                max = MAX_MESSAGE_BYTES,
                "message exceeds tile capacity, every tile will hold a truncated copy"
            );
        }

        let mut bands = dwt::forward_observed(luma, self.observer.as_ref())?;
        let stream = bitstream::encode(message);
        let tiles = tile::embed_band(
            &self.dct,
            &mut bands.hl,
            &stream,
            self.config.delta,
            self.observer.as_ref(),
        )?;
        if tiles == 0 {
            let (rows, cols) = bands.dimensions();
            tracing::warn!(rows, cols, "HL band holds no full tile, nothing embedded");
        }

        let marked = dwt::inverse_observed(bands, self.observer.as_ref())?;
        tracing::info!(tiles, bits = stream.len(), "watermark embedded");
        Ok(marked)
    }

    /// Decodes every full tile independently.
    pub fn extract_tiles(&self, luma: &Matrix) -> Result<Vec<TileResult>> {
        let bands = dwt::forward_observed(luma, self.observer.as_ref())?;
        let tiles = tile::read_band(&self.dct, &bands.hl, self.config.delta)?;

        let results: Vec<TileResult> = tiles
            .into_iter()
            .map(|(index, bits)| {
                let frame = bitstream::decode(&bits);
                self.report(index, frame.as_ref());
                TileResult { index, bits, frame }
            })
            .collect();

        tracing::debug!(
            tiles = results.len(),
            found = results.iter().filter(|t| t.frame.is_some()).count(),
            "tiles scanned"
        );
        Ok(results)
    }

    /// Recovers the message, voting across tiles when they disagree.
    pub fn extract(&self, luma: &Matrix) -> Result<Consensus> {
        let results = self.extract_tiles(luma)?;
        let tiles = results.len();
        let found = results
            .into_iter()
            .filter_map(|t| t.frame.map(|frame| (t.index, frame.message)));

        let consensus = consensus::resolve(found, tiles)?;
        if !consensus.is_unanimous() {
            self.observer.event(&Event::Disagreement {
                distinct: consensus.tally.len(),
                found: consensus.found,
                chosen: &consensus.message,
            });
            tracing::warn!(
                distinct = consensus.tally.len(),
                votes = consensus.votes,
                dissenters = consensus.dissenters(),
                "tiles disagree, using the majority message"
            );
            tracing::debug!(voters = ?consensus.voters, "tiles holding the majority message");
        }
        tracing::info!(votes = consensus.votes, tiles, "watermark extracted");
        Ok(consensus)
    }

    fn report(&self, tile: TileIndex, frame: Option<&Frame>) {
        if let Some(frame) = frame {
            self.observer.event(&Event::FlagMatched {
                tile,
                flag: Flag::Start,
                position: frame.start,
            });
            self.observer.event(&Event::FlagMatched {
                tile,
                flag: Flag::End,
                position: frame.end,
            });
        }
        self.observer.event(&Event::TileDecoded {
            tile,
            message: frame.map(|f| f.message.as_str()),
        });
    }
}
