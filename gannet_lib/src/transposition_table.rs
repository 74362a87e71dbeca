//! Shared transposition table.
//!
//! One packed entry per slot, no locks: the key word is stored XOR'd
//! with the payload word, so a read torn between two writers fails the
//! key check and reports a miss. Slots are addressed with the
//! multiply-shift mapping, which needs no power-of-two table length.

use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc, RwLock,
};

use crate::board::PackedMove;
use crate::score::Score;

/// Bound kind of a stored score. `Exact` carries both bound bits so that
/// "has a lower bound" tests work with a bitwise and.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    None = 0,
    Upper = 1,
    Lower = 2,
    Exact = 3,
}

impl Flag {
    fn from_bits(bits: u64) -> Self {
        match bits & 0b11 {
            1 => Flag::Upper,
            2 => Flag::Lower,
            3 => Flag::Exact,
            _ => Flag::None,
        }
    }

    #[inline]
    pub fn includes_lower(self) -> bool {
        self as u8 & Flag::Lower as u8 != 0
    }
}

/// Decoded view of a probed entry. The score is still TT-relative; the
/// caller re-bases mate scores with `score_from_tt`.
#[derive(Clone, Copy, Debug)]
pub struct TtData {
    pub score: Score,
    pub mv: PackedMove,
    pub depth: i32,
    pub flag: Flag,
    age: u8,
}

// data word layout:
//   bits  0..16  score (i16)
//   bits 16..32  packed move
//   bits 32..40  depth
//   bits 40..42  flag
//   bits 42..48  age
fn encode(score: Score, mv: PackedMove, depth: i32, flag: Flag, age: u8) -> u64 {
    (score as i16 as u16 as u64)
        | (mv.bits() as u64) << 16
        | (depth.clamp(0, 255) as u64) << 32
        | (flag as u64) << 40
        | ((age & 0x3f) as u64) << 42
}

fn decode(data: u64) -> TtData {
    TtData {
        score: data as u16 as i16 as Score,
        mv: PackedMove::from_bits((data >> 16) as u16),
        depth: (data >> 32 & 0xff) as i32,
        flag: Flag::from_bits(data >> 40),
        age: (data >> 42 & 0x3f) as u8,
    }
}

#[derive(Default)]
struct Entry {
    key: AtomicU64,
    data: AtomicU64,
}

const ENTRY_SIZE: usize = std::mem::size_of::<Entry>();
/// Entries at most this many plies shallower than a new store are
/// overwritten even within the same search generation.
const REPLACE_DEPTH_MARGIN: i32 = 3;

#[derive(Clone)]
pub struct TranspositionTable {
    table: Arc<RwLock<Vec<Entry>>>,
    age: Arc<AtomicU8>,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let tt = Self {
            table: Arc::new(RwLock::new(Vec::new())),
            age: Arc::new(AtomicU8::new(0)),
        };
        tt.set_size(size_mb);
        tt
    }

    pub fn set_size(&self, size_mb: usize) {
        let length = size_mb * 1024 * 1024 / ENTRY_SIZE;
        if let Ok(mut table) = self.table.write() {
            table.clear();
            table.resize_with(length, Entry::default);
        }
    }

    pub fn clear(&self) {
        if let Ok(table) = self.table.read() {
            for entry in table.iter() {
                entry.key.store(0, Ordering::Relaxed);
                entry.data.store(0, Ordering::Relaxed);
            }
        }
        self.age.store(0, Ordering::Relaxed);
    }

    /// Advance the search generation; stale entries become preferred
    /// replacement victims.
    pub fn new_search(&self) {
        self.age.fetch_add(1, Ordering::Relaxed);
    }

    fn current_age(&self) -> u8 {
        self.age.load(Ordering::Relaxed) & 0x3f
    }

    #[inline]
    fn slot(hash: u64, len: usize) -> usize {
        ((hash as u128 * len as u128) >> 64) as usize
    }

    pub fn probe(&self, hash: u64) -> Option<TtData> {
        let table = self.table.read().ok()?;
        let entry = table.get(Self::slot(hash, table.len()))?;
        let data = entry.data.load(Ordering::Acquire);
        if entry.key.load(Ordering::Acquire) ^ data == hash && data != 0 {
            Some(decode(data))
        } else {
            None
        }
    }

    /// Store a TT-relative score. Existing entries survive only when they
    /// are from the current generation and meaningfully deeper.
    pub fn store(&self, hash: u64, mv: PackedMove, depth: i32, score: Score, flag: Flag) {
        let table = match self.table.read() {
            Ok(table) => table,
            Err(_) => return,
        };
        if table.is_empty() {
            return;
        }
        let entry = &table[Self::slot(hash, table.len())];
        let age = self.current_age();

        let old_data = entry.data.load(Ordering::Acquire);
        let old_key = entry.key.load(Ordering::Acquire);
        let mut mv = mv;
        if old_data != 0 {
            let old = decode(old_data);
            // keep the old best move when the new store for the same
            // position has none
            if old_key ^ old_data == hash && mv.is_none() {
                mv = old.mv;
            }
            if old.age == age && old.depth > depth + REPLACE_DEPTH_MARGIN {
                return;
            }
        }

        let data = encode(score, mv, depth, flag, age);
        entry.key.store(hash ^ data, Ordering::Release);
        entry.data.store(data, Ordering::Release);
    }

    /// Sampled occupancy in entries per mille of the current generation.
    pub fn hashfull(&self) -> usize {
        let table = match self.table.read() {
            Ok(table) => table,
            Err(_) => return 0,
        };
        let sample = table.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let age = self.current_age();
        let filled = table[..sample]
            .iter()
            .filter(|e| {
                let data = e.data.load(Ordering::Relaxed);
                data != 0 && decode(data).age == age
            })
            .count();
        filled * 1000 / sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{mate_in, score_from_tt, score_to_tt};

    fn mv(bits: u16) -> PackedMove {
        PackedMove::from_bits(bits)
    }

    #[test]
    fn store_then_probe_round_trips() {
        let tt = TranspositionTable::new(1);
        tt.store(0xdeadbeef, mv(0x1234), 9, -250, Flag::Exact);
        let data = tt.probe(0xdeadbeef).unwrap();
        assert_eq!(data.score, -250);
        assert_eq!(data.mv, mv(0x1234));
        assert_eq!(data.depth, 9);
        assert_eq!(data.flag, Flag::Exact);
        assert!(tt.probe(0xdeadbee0).is_none());
    }

    #[test]
    fn mate_scores_survive_normalisation() {
        let tt = TranspositionTable::new(1);
        let ply = 7;
        let score = mate_in(ply + 3);
        tt.store(42, mv(1), 5, score_to_tt(score, ply), Flag::Lower);
        let data = tt.probe(42).unwrap();
        assert_eq!(score_from_tt(data.score, ply), score);
    }

    #[test]
    fn shallow_entries_are_replaced_deep_ones_kept() {
        let tt = TranspositionTable::new(1);
        tt.store(7, mv(2), 12, 30, Flag::Exact);
        tt.store(7, mv(3), 2, 99, Flag::Upper);
        assert_eq!(tt.probe(7).unwrap().depth, 12);

        tt.store(7, mv(4), 10, 55, Flag::Lower);
        assert_eq!(tt.probe(7).unwrap().depth, 10);
    }

    #[test]
    fn stale_generations_are_always_replaced() {
        let tt = TranspositionTable::new(1);
        tt.store(7, mv(2), 30, 1, Flag::Exact);
        tt.new_search();
        tt.store(7, mv(5), 1, 2, Flag::Upper);
        let data = tt.probe(7).unwrap();
        assert_eq!(data.depth, 1);
        assert_eq!(data.score, 2);
    }

    #[test]
    fn null_move_store_keeps_existing_move() {
        let tt = TranspositionTable::new(1);
        tt.store(9, mv(0x421), 4, 17, Flag::Exact);
        tt.store(9, PackedMove::NONE, 6, 20, Flag::Lower);
        assert_eq!(tt.probe(9).unwrap().mv, mv(0x421));
    }

    #[test]
    fn includes_lower_bits() {
        assert!(Flag::Lower.includes_lower());
        assert!(Flag::Exact.includes_lower());
        assert!(!Flag::Upper.includes_lower());
        assert!(!Flag::None.includes_lower());
    }

    #[test]
    fn hashfull_counts_current_generation_only() {
        // 1 MiB of 16-byte entries: slot(hash) = hash >> 48
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull(), 0);
        for slot in 1..=200u64 {
            tt.store(slot << 48, mv(1), 1, 0, Flag::Exact);
        }
        assert_eq!(tt.hashfull(), 200);
        tt.new_search();
        assert_eq!(tt.hashfull(), 0);
    }
}
