//! Syzygy endgame tablebase adapter.
//!
//! WDL probes feed the search as bounded mate-distance scores; the DTZ
//! probe picks a root move directly when the position is already in the
//! tables. Probe failures of any kind degrade to `None` and the search
//! carries on without tablebase knowledge.

use std::path::Path;

use shakmaty::Move;
use shakmaty_syzygy::{Tablebase, Wdl};

use crate::board::Board;
use crate::score::{Score, VALUE_TB_LOSS_IN_MAX_PLY, VALUE_TB_WIN_IN_MAX_PLY};

pub struct SyzygyTablebase {
    tb: Tablebase<shakmaty::Chess>,
}

/// DTZ-chosen root move with its wdl-derived score and distance.
pub struct RootProbe {
    pub mv: Move,
    pub score: Score,
    pub dtz: i32,
}

impl SyzygyTablebase {
    pub fn load<P: AsRef<Path>>(path: P) -> Option<Self> {
        let mut tb = Tablebase::new();
        match tb.add_directory(path.as_ref()) {
            Ok(count) if count > 0 => Some(Self { tb }),
            _ => None,
        }
    }

    pub fn max_pieces(&self) -> usize {
        self.tb.max_pieces()
    }

    /// Win/draw/loss from the side to move's view, or `None` when the
    /// position has too many pieces or the probe fails.
    pub fn probe_wdl(&self, board: &Board) -> Option<Wdl> {
        if board.occupied_count() > self.tb.max_pieces() {
            return None;
        }
        self.tb.probe_wdl_after_zeroing(board.position()).ok()
    }

    /// Best root move by distance-to-zeroing.
    pub fn probe_root(&self, board: &Board) -> Option<RootProbe> {
        if board.occupied_count() > self.tb.max_pieces() {
            return None;
        }
        let (mv, dtz) = self.tb.best_move(board.position()).ok()??;
        let score = match self.probe_wdl(board)? {
            Wdl::Win => VALUE_TB_WIN_IN_MAX_PLY,
            Wdl::Loss => VALUE_TB_LOSS_IN_MAX_PLY,
            Wdl::Draw | Wdl::CursedWin | Wdl::BlessedLoss => 0,
        };
        Some(RootProbe {
            mv,
            score,
            dtz: dtz.ignore_rounding().0,
        })
    }
}
