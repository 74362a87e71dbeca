//! Per-worker search state: stack frames, the triangular PV table,
//! killer/history heuristics and the root effort counters.

use crate::board::PackedMove;
use crate::history_tables::{history_bonus, ButterflyHistory, KillerMoves};
use crate::score::{Score, MAX_PLY};

/// Frames live at plies -2..=MAX_PLY+1, indexed by `ply + 2`; the two
/// frames below the root hold the sentinels that the "improving" and
/// null-move guards read.
pub const STACK_SIZE: usize = MAX_PLY + 4;

#[derive(Clone, Copy)]
pub struct StackEntry {
    pub eval: Score,
    pub current_move: PackedMove,
    pub excluded_move: PackedMove,
}

impl Default for StackEntry {
    fn default() -> Self {
        Self {
            eval: 0,
            current_move: PackedMove::NONE,
            excluded_move: PackedMove::NONE,
        }
    }
}

pub struct ThreadData {
    pub stack: Box<[StackEntry; STACK_SIZE]>,
    pub killers: KillerMoves,
    pub history: ButterflyHistory,
    pub pv_table: Box<[[PackedMove; MAX_PLY]; MAX_PLY]>,
    pub pv_length: [usize; MAX_PLY],
    /// Nodes spent below each root from/to pair, for time management.
    pub spent_effort: Box<[[u64; 64]; 64]>,
}

impl Default for ThreadData {
    fn default() -> Self {
        Self {
            stack: Box::new([StackEntry::default(); STACK_SIZE]),
            killers: KillerMoves::default(),
            history: ButterflyHistory::default(),
            pv_table: Box::new([[PackedMove::NONE; MAX_PLY]; MAX_PLY]),
            pv_length: [0; MAX_PLY],
            spent_effort: Box::new([[0; 64]; 64]),
        }
    }
}

impl ThreadData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_for_search(&mut self) {
        *self.stack = [StackEntry::default(); STACK_SIZE];
        *self.spent_effort = [[0; 64]; 64];
        self.pv_length = [0; MAX_PLY];
    }

    /// Write `mv` at the head of this ply's line and splice in the line
    /// found one ply deeper.
    pub fn update_pv(&mut self, ply: usize, mv: PackedMove) {
        if ply + 1 >= MAX_PLY {
            return;
        }
        let (head, tail) = self.pv_table.split_at_mut(ply + 1);
        let child_len = self.pv_length[ply + 1].max(ply + 1);
        head[ply][ply] = mv;
        head[ply][ply + 1..child_len].copy_from_slice(&tail[0][ply + 1..child_len]);
        self.pv_length[ply] = child_len;
    }

    pub fn root_pv(&self) -> &[PackedMove] {
        &self.pv_table[0][..self.pv_length[0]]
    }

    /// On a beta cutoff by a quiet move: rotate the killers and reward
    /// the cutoff move at the expense of the quiets tried before it.
    /// Captures do not participate.
    #[allow(clippy::too_many_arguments)]
    pub fn update_all_histories(
        &mut self,
        stm: usize,
        best_move: PackedMove,
        best: Score,
        beta: Score,
        depth: i32,
        quiets: &[PackedMove],
        ply: usize,
        best_is_quiet: bool,
    ) {
        if best < beta || !best_is_quiet {
            return;
        }

        self.killers.store(ply, best_move);

        let bonus = history_bonus(depth);
        if depth > 1 {
            self.history.apply(stm, best_move, bonus);
        }
        for &quiet in quiets {
            if quiet != best_move {
                self.history.apply(stm, quiet, -bonus);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(from: u16, to: u16) -> PackedMove {
        PackedMove::from_bits(from | to << 6)
    }

    #[test]
    fn pv_splicing_builds_lines_front_to_back() {
        let mut data = ThreadData::new();
        data.pv_length[2] = 2; // empty line below ply 1
        data.update_pv(1, mv(8, 16));
        assert_eq!(data.pv_length[1], 2);
        data.update_pv(0, mv(10, 18));
        assert_eq!(data.pv_length[0], 2);
        assert_eq!(data.root_pv(), &[mv(10, 18), mv(8, 16)]);
    }

    #[test]
    fn cutoff_updates_reward_best_and_punish_rest() {
        let mut data = ThreadData::new();
        let best = mv(1, 2);
        let other = mv(3, 4);
        data.update_all_histories(0, best, 50, 40, 6, &[other, best], 3, true);

        assert!(data.history.get(0, best) > 0);
        assert!(data.history.get(0, other) < 0);
        assert_eq!(data.killers.get(3, 0), best);
    }

    #[test]
    fn fail_lows_and_captures_leave_tables_unchanged() {
        let mut data = ThreadData::new();
        let best = mv(1, 2);
        data.update_all_histories(0, best, 30, 40, 6, &[], 3, true);
        data.update_all_histories(0, best, 50, 40, 6, &[], 3, false);
        assert_eq!(data.history.get(0, best), 0);
        assert_eq!(data.killers.get(3, 0), PackedMove::NONE);
    }

    #[test]
    fn shallow_cutoffs_skip_the_best_move_bonus() {
        let mut data = ThreadData::new();
        let best = mv(1, 2);
        let other = mv(3, 4);
        data.update_all_histories(1, best, 90, 40, 1, &[other], 0, true);
        assert_eq!(data.history.get(1, best), 0);
        assert!(data.history.get(1, other) < 0);
    }
}
