//! Score arithmetic and mate encoding.
//!
//! The score domain is a partitioned `i32`: ordinary centipawns in the
//! middle, tablebase wins/losses just inside the mate bands, and
//! mate-in-N at the extremes. Mate scores stored in the transposition
//! table are rebased to the current ply so that a mate found at one
//! depth stays correct when the entry is read at another.

pub type Score = i32;

pub const MAX_PLY: usize = 120;
pub const MAX_MOVES: usize = 256;

pub const VALUE_MATE: Score = 32_000;
pub const VALUE_INFINITE: Score = 32_001;
pub const VALUE_NONE: Score = 32_002;

pub const VALUE_MATE_IN_PLY: Score = VALUE_MATE - MAX_PLY as Score;
pub const VALUE_MATED_IN_PLY: Score = -VALUE_MATE_IN_PLY;

pub const VALUE_TB_WIN: Score = VALUE_MATE_IN_PLY;
pub const VALUE_TB_LOSS: Score = -VALUE_TB_WIN;
pub const VALUE_TB_WIN_IN_MAX_PLY: Score = VALUE_TB_WIN - MAX_PLY as Score;
pub const VALUE_TB_LOSS_IN_MAX_PLY: Score = -VALUE_TB_WIN_IN_MAX_PLY;

#[inline]
pub fn mate_in(ply: usize) -> Score {
    VALUE_MATE - ply as Score
}

#[inline]
pub fn mated_in(ply: usize) -> Score {
    -VALUE_MATE + ply as Score
}

/// Rebase a mate score from "relative to the root" to "relative to this
/// node" before it is written to the transposition table.
#[inline]
pub fn score_to_tt(score: Score, ply: usize) -> Score {
    if score >= VALUE_MATE_IN_PLY {
        score + ply as Score
    } else if score <= VALUE_MATED_IN_PLY {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`], applied after a probe.
#[inline]
pub fn score_from_tt(score: Score, ply: usize) -> Score {
    if score >= VALUE_MATE_IN_PLY {
        score - ply as Score
    } else if score <= VALUE_MATED_IN_PLY {
        score + ply as Score
    } else {
        score
    }
}

/// Format a score for a UCI info line as `cp N` or `mate N`.
///
/// Scores within the randomised-draw jitter band print as `cp 0`.
pub fn format_uci_score(score: Score) -> String {
    let score = if score.abs() <= 4 { 0 } else { score };

    if score >= VALUE_MATE_IN_PLY {
        let d = VALUE_MATE - score;
        format!("mate {}", d / 2 + (d & 1))
    } else if score <= VALUE_MATED_IN_PLY {
        let d = VALUE_MATE + score;
        format!("mate {}", -(d / 2 + (d & 1)))
    } else {
        format!("cp {score}")
    }
}
