//! Structured events for watching the pipeline from outside.
//!
//! The core never prints. Anything that wants visibility into a run (a CLI
//! in verbose mode, a test, a profiler) implements [`Observer`] and hands it
//! to the [`WatermarkEngine`](crate::engine::WatermarkEngine).

use std::time::Duration;

use crate::tile::TileIndex;

/// One fork-join pass of the wavelet transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    ForwardRows,
    ForwardColumns,
    InverseColumns,
    InverseRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    PassStarted {
        pass: Pass,
        rows: usize,
        cols: usize,
    },
    PassFinished {
        pass: Pass,
        elapsed: Duration,
    },
    CoefficientEmbedded {
        tile: TileIndex,
        block: usize,
        position: (usize, usize),
        before: f64,
        after: f64,
    },
    /// `position` is the bit offset of the flag inside the tile's stream.
    FlagMatched {
        tile: TileIndex,
        flag: Flag,
        position: usize,
    },
    TileDecoded {
        tile: TileIndex,
        message: Option<&'a str>,
    },
    /// Tiles decoded to more than one distinct message.
    Disagreement {
        distinct: usize,
        found: usize,
        chosen: &'a str,
    },
}

pub trait Observer: Send + Sync {
    fn event(&self, event: &Event<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn event(&self, _event: &Event<'_>) {}
}

/// Forwards events to `tracing` at trace/debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn event(&self, event: &Event<'_>) {
        match event {
            Event::PassStarted { pass, rows, cols } => {
                tracing::trace!(?pass, rows, cols, "dwt pass started")
            }
            Event::PassFinished { pass, elapsed } => {
                tracing::debug!(?pass, ?elapsed, "dwt pass finished")
            }
            Event::CoefficientEmbedded {
                tile,
                block,
                position,
                before,
                after,
            } => tracing::trace!(%tile, block, ?position, before, after, "coefficient embedded"),
            Event::FlagMatched {
                tile,
                flag,
                position,
            } => tracing::trace!(%tile, ?flag, position, "flag matched"),
            Event::TileDecoded { tile, message } => match message {
                Some(message) => tracing::debug!(%tile, message, "message found"),
                None => tracing::debug!(%tile, "no valid message"),
            },
            Event::Disagreement {
                distinct,
                found,
                chosen,
            } => tracing::warn!(distinct, found, chosen, "tiles disagree on the message"),
        }
    }
}
