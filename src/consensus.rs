//! Majority vote over the messages decoded from individual tiles.

use crate::error::{Result, WatermarkError};
use crate::tile::TileIndex;

/// Outcome of the vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consensus {
    pub message: String,
    /// Tiles that decoded to `message`.
    pub votes: usize,
    /// Tiles that decoded to any message.
    pub found: usize,
    /// Tiles scanned, found or not.
    pub tiles: usize,
    /// Every distinct message with its count, in order of first appearance.
    pub tally: Vec<(String, usize)>,
    /// Tiles that voted for `message`, in scan order.
    pub voters: Vec<TileIndex>,
}

impl Consensus {
    /// Tiles that decoded a message other than the chosen one.
    pub fn dissenters(&self) -> usize {
        self.found - self.votes
    }

    /// All tiles that found a message found the same one.
    pub fn is_unanimous(&self) -> bool {
        self.tally.len() == 1
    }
}

/// Picks the most frequent message; ties go to the one seen first in tile order.
///
/// Fails with [`WatermarkError::NotFound`] when no tile produced a message.
pub fn resolve<I>(found: I, tiles: usize) -> Result<Consensus>
where
    I: IntoIterator<Item = (TileIndex, String)>,
{
    let mut ballots: Vec<(String, Vec<TileIndex>)> = Vec::new();
    for (index, message) in found {
        match ballots.iter_mut().find(|(m, _)| *m == message) {
            Some((_, tiles)) => tiles.push(index),
            None => ballots.push((message, vec![index])),
        }
    }

    let mut best: Option<usize> = None;
    for (i, (_, tiles)) in ballots.iter().enumerate() {
        if best.map_or(true, |b| tiles.len() > ballots[b].1.len()) {
            best = Some(i);
        }
    }
    let best = best.ok_or(WatermarkError::NotFound { tiles })?;

    let tally: Vec<(String, usize)> = ballots
        .iter()
        .map(|(message, voters)| (message.clone(), voters.len()))
        .collect();
    let (message, voters) = ballots.swap_remove(best);

    Ok(Consensus {
        message,
        votes: voters.len(),
        found: tally.iter().map(|(_, count)| count).sum(),
        tiles,
        tally,
        voters,
    })
}
