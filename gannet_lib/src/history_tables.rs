//! Quiet-move ordering heuristics: butterfly history and killer moves.

use crate::board::PackedMove;
use crate::score::MAX_PLY;

/// Self-limiting divisor: entries converge towards +/-16384 instead of
/// growing without bound.
pub const HISTORY_GRAVITY: i32 = 16_384;

/// Depth-scaled cutoff bonus, saturating at 2000.
#[inline]
pub fn history_bonus(depth: i32) -> i32 {
    (depth * 155).min(2000)
}

/// From/to-indexed history per side to move.
pub struct ButterflyHistory(Box<[[[i32; 64]; 64]; 2]>);

impl Default for ButterflyHistory {
    fn default() -> Self {
        Self(Box::new([[[0; 64]; 64]; 2]))
    }
}

impl ButterflyHistory {
    #[inline]
    pub fn get(&self, stm: usize, mv: PackedMove) -> i32 {
        self.0[stm][mv.from_sq()][mv.to_sq()]
    }

    /// Apply a signed, gravity-damped adjustment: positive for the move
    /// that produced the cutoff, negative for the quiets tried before it.
    pub fn apply(&mut self, stm: usize, mv: PackedMove, bonus: i32) {
        let entry = &mut self.0[stm][mv.from_sq()][mv.to_sq()];
        *entry += bonus - *entry * bonus.abs() / HISTORY_GRAVITY;
    }

    pub fn clear(&mut self) {
        self.0.iter_mut().flatten().flatten().for_each(|h| *h = 0);
    }
}

/// Two killer slots per ply. An update shifts slot 0 into slot 1; storing
/// the same move twice simply leaves both slots equal.
pub struct KillerMoves(Box<[[PackedMove; 2]; MAX_PLY]>);

impl Default for KillerMoves {
    fn default() -> Self {
        Self(Box::new([[PackedMove::NONE; 2]; MAX_PLY]))
    }
}

impl KillerMoves {
    pub fn store(&mut self, ply: usize, mv: PackedMove) {
        if ply < MAX_PLY {
            self.0[ply][1] = self.0[ply][0];
            self.0[ply][0] = mv;
        }
    }

    #[inline]
    pub fn get(&self, ply: usize, slot: usize) -> PackedMove {
        if ply < MAX_PLY {
            self.0[ply][slot]
        } else {
            PackedMove::NONE
        }
    }

    pub fn clear(&mut self) {
        self.0.iter_mut().flatten().for_each(|k| *k = PackedMove::NONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(from: u16, to: u16) -> PackedMove {
        PackedMove::from_bits(from | to << 6)
    }

    #[test]
    fn bonus_saturates() {
        assert_eq!(history_bonus(1), 155);
        assert_eq!(history_bonus(12), 1860);
        assert_eq!(history_bonus(13), 2000);
        assert_eq!(history_bonus(90), 2000);
    }

    #[test]
    fn history_magnitude_is_bounded() {
        let mut history = ButterflyHistory::default();
        let m = mv(12, 28);
        for _ in 0..1000 {
            history.apply(0, m, 2000);
        }
        assert!(history.get(0, m) <= HISTORY_GRAVITY + 2000);
        for _ in 0..2000 {
            history.apply(0, m, -2000);
        }
        assert!(history.get(0, m) >= -(HISTORY_GRAVITY + 2000));
    }

    #[test]
    fn bonus_and_malus_pull_in_opposite_directions() {
        let mut history = ButterflyHistory::default();
        let m = mv(6, 21);
        history.apply(1, m, 500);
        assert_eq!(history.get(1, m), 500);
        history.apply(1, m, -500);
        assert!(history.get(1, m) < 500);
        assert_eq!(history.get(0, m), 0);
    }

    #[test]
    fn killer_slots_stay_distinct_after_distinct_updates() {
        let mut killers = KillerMoves::default();
        let first = mv(1, 2);
        let second = mv(3, 4);
        killers.store(5, first);
        killers.store(5, second);
        assert_eq!(killers.get(5, 0), second);
        assert_eq!(killers.get(5, 1), first);
        assert_ne!(killers.get(5, 0), killers.get(5, 1));
        assert_eq!(killers.get(6, 0), PackedMove::NONE);
    }
}
