//! Staged move ordering.
//!
//! A lazy cursor over the legal moves: transposition table move first,
//! then winning captures by MVV/LVA, the two killers, quiets by history
//! and finally the losing captures. Each stage owns a small buffer and
//! yields by selection, so sorting work is only spent on moves that are
//! actually searched. Moves handed out by an earlier stage are removed
//! from their buffer and never repeat.

use arrayvec::ArrayVec;
use shakmaty::Move;

use crate::board::{Board, PackedMove};
use crate::history_tables::ButterflyHistory;
use crate::score::MAX_MOVES;

/// Most-valuable-victim / least-valuable-attacker grid, role-indexed
/// (1-based; row 0 is the no-victim row for quiet promotions).
#[rustfmt::skip]
const MVV_LVA: [[i32; 7]; 7] = [
    [0,  0,  0,  0,  0,  0,  0],
    [0, 15, 14, 13, 12, 11, 10], // pawn taken
    [0, 25, 24, 23, 22, 21, 20], // knight taken
    [0, 35, 34, 33, 32, 31, 30], // bishop taken
    [0, 45, 44, 43, 42, 41, 40], // rook taken
    [0, 55, 54, 53, 52, 51, 50], // queen taken
    [0,  0,  0,  0,  0,  0,  0],
];

const PROMOTION_SCORE: i32 = 40;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    TtMove,
    GoodCaptures,
    KillerOne,
    KillerTwo,
    Quiets,
    BadCaptures,
    Done,
}

pub struct MovePicker {
    stage: Stage,
    qsearch: bool,
    evasions: bool,
    tt_move: PackedMove,
    killers: [PackedMove; 2],
    search_moves: Vec<PackedMove>,
    generated: bool,
    captures: ArrayVec<(Move, i32), MAX_MOVES>,
    bad_captures: ArrayVec<(Move, i32), MAX_MOVES>,
    quiets: ArrayVec<(Move, i32), MAX_MOVES>,
    capture_idx: usize,
    quiet_idx: usize,
    bad_idx: usize,
}

impl MovePicker {
    /// Picker for the main search. `search_moves` restricts the root.
    pub fn new(
        tt_move: PackedMove,
        killers: [PackedMove; 2],
        search_moves: Vec<PackedMove>,
    ) -> Self {
        Self {
            stage: if tt_move.is_some() {
                Stage::TtMove
            } else {
                Stage::GoodCaptures
            },
            qsearch: false,
            evasions: false,
            tt_move,
            killers,
            search_moves,
            generated: false,
            captures: ArrayVec::new(),
            bad_captures: ArrayVec::new(),
            quiets: ArrayVec::new(),
            capture_idx: 0,
            quiet_idx: 0,
            bad_idx: 0,
        }
    }

    /// Picker for quiescence: noisy moves only, or every evasion when in
    /// check.
    pub fn new_qsearch(tt_move: PackedMove, in_check: bool) -> Self {
        Self {
            stage: if tt_move.is_some() {
                Stage::TtMove
            } else {
                Stage::GoodCaptures
            },
            qsearch: true,
            evasions: in_check,
            tt_move,
            killers: [PackedMove::NONE; 2],
            search_moves: Vec::new(),
            generated: false,
            captures: ArrayVec::new(),
            bad_captures: ArrayVec::new(),
            quiets: ArrayVec::new(),
            capture_idx: 0,
            quiet_idx: 0,
            bad_idx: 0,
        }
    }

    pub fn next(&mut self, board: &Board, history: &ButterflyHistory) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.ensure_generated(board, history);
                    self.stage = Stage::GoodCaptures;
                    if let Some(mv) = self
                        .take(self.tt_move, ListId::Captures)
                        .or_else(|| self.take(self.tt_move, ListId::Quiets))
                        .or_else(|| self.take(self.tt_move, ListId::BadCaptures))
                    {
                        return Some(mv);
                    }
                }
                Stage::GoodCaptures => {
                    self.ensure_generated(board, history);
                    if let Some(mv) = pick_best(&mut self.captures, &mut self.capture_idx) {
                        return Some(mv);
                    }
                    self.stage = if !self.qsearch {
                        Stage::KillerOne
                    } else if self.evasions {
                        Stage::Quiets
                    } else {
                        Stage::Done
                    };
                }
                Stage::KillerOne => {
                    self.stage = Stage::KillerTwo;
                    let killer = self.killers[0];
                    if killer != self.tt_move {
                        if let Some(mv) = self.take(killer, ListId::Quiets) {
                            return Some(mv);
                        }
                    }
                }
                Stage::KillerTwo => {
                    self.stage = Stage::Quiets;
                    let killer = self.killers[1];
                    if killer != self.tt_move && killer != self.killers[0] {
                        if let Some(mv) = self.take(killer, ListId::Quiets) {
                            return Some(mv);
                        }
                    }
                }
                Stage::Quiets => {
                    if let Some(mv) = pick_best(&mut self.quiets, &mut self.quiet_idx) {
                        return Some(mv);
                    }
                    self.stage = if self.qsearch {
                        Stage::Done
                    } else {
                        Stage::BadCaptures
                    };
                }
                Stage::BadCaptures => {
                    if let Some(mv) = pick_best(&mut self.bad_captures, &mut self.bad_idx) {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }

    fn ensure_generated(&mut self, board: &Board, history: &ButterflyHistory) {
        if self.generated {
            return;
        }
        self.generated = true;

        let stm = board.stm_index();
        let moves = if self.qsearch && !self.evasions {
            board.noisy_moves()
        } else {
            board.legal_moves()
        };

        for mv in moves {
            let packed = PackedMove::pack(&mv);
            if !self.search_moves.is_empty() && !self.search_moves.contains(&packed) {
                continue;
            }
            let noisy = mv.is_capture() || mv.promotion().is_some();
            if noisy {
                let score = score_noisy(&mv);
                if self.qsearch || board.see(&mv, 0) {
                    self.captures.push((mv, score));
                } else {
                    self.bad_captures.push((mv, score));
                }
            } else {
                let score = history.get(stm, packed);
                self.quiets.push((mv, score));
            }
        }
    }

    /// Remove and return a specific move from one of the buffers. Only
    /// called while that buffer's cursor is still at the front.
    fn take(&mut self, packed: PackedMove, list: ListId) -> Option<Move> {
        if !packed.is_some() {
            return None;
        }
        let list = match list {
            ListId::Captures => &mut self.captures,
            ListId::Quiets => &mut self.quiets,
            ListId::BadCaptures => &mut self.bad_captures,
        };
        let index = list
            .iter()
            .position(|(mv, _)| PackedMove::pack(mv) == packed)?;
        Some(list.swap_remove(index).0)
    }
}

enum ListId {
    Captures,
    Quiets,
    BadCaptures,
}

fn pick_best(list: &mut ArrayVec<(Move, i32), MAX_MOVES>, cursor: &mut usize) -> Option<Move> {
    if *cursor >= list.len() {
        return None;
    }
    let mut best = *cursor;
    for i in *cursor + 1..list.len() {
        if list[i].1 > list[best].1 {
            best = i;
        }
    }
    list.swap(*cursor, best);
    let mv = list[*cursor].0.clone();
    *cursor += 1;
    Some(mv)
}

fn score_noisy(mv: &Move) -> i32 {
    let attacker = mv.role() as usize;
    let victim = mv.capture().map(|r| r as usize).unwrap_or(0);
    let mut score = MVV_LVA[victim][attacker];
    if mv.promotion().is_some() {
        score += PROMOTION_SCORE;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::history_tables::ButterflyHistory;

    fn drain(picker: &mut MovePicker, board: &Board, history: &ButterflyHistory) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(mv) = picker.next(board, history) {
            out.push(board.uci(&mv));
        }
        out
    }

    #[test]
    fn yields_every_legal_move_exactly_once() {
        let board = Board::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4",
        )
        .unwrap();
        let history = ButterflyHistory::default();
        let mut picker = MovePicker::new(PackedMove::NONE, [PackedMove::NONE; 2], Vec::new());
        let mut yielded = drain(&mut picker, &board, &history);
        let mut legal: Vec<String> = board.legal_moves().iter().map(|m| board.uci(m)).collect();
        yielded.sort();
        legal.sort();
        assert_eq!(yielded, legal);
    }

    #[test]
    fn tt_move_comes_first_and_never_repeats() {
        let board = Board::new();
        let history = ButterflyHistory::default();
        let tt = PackedMove::pack(&board.parse_uci_move("d2d4").unwrap());
        let mut picker = MovePicker::new(tt, [PackedMove::NONE; 2], Vec::new());
        let yielded = drain(&mut picker, &board, &history);
        assert_eq!(yielded[0], "d2d4");
        assert_eq!(yielded.iter().filter(|m| *m == "d2d4").count(), 1);
        assert_eq!(yielded.len(), 20);
    }

    #[test]
    fn killers_precede_other_quiets() {
        let board = Board::new();
        let history = ButterflyHistory::default();
        let killer = PackedMove::pack(&board.parse_uci_move("h2h3").unwrap());
        let mut picker = MovePicker::new(PackedMove::NONE, [killer, PackedMove::NONE], Vec::new());
        let yielded = drain(&mut picker, &board, &history);
        assert_eq!(yielded[0], "h2h3");
    }

    #[test]
    fn duplicate_killers_do_not_repeat() {
        let board = Board::new();
        let history = ButterflyHistory::default();
        let killer = PackedMove::pack(&board.parse_uci_move("h2h3").unwrap());
        let mut picker = MovePicker::new(PackedMove::NONE, [killer, killer], Vec::new());
        let yielded = drain(&mut picker, &board, &history);
        assert_eq!(yielded.iter().filter(|m| *m == "h2h3").count(), 1);
        assert_eq!(yielded.len(), 20);
    }

    #[test]
    fn winning_captures_come_before_losing_ones() {
        // queen can take a defended pawn (losing), knight an undefended one
        let board =
            Board::from_fen("4k3/2p5/3p4/8/6p1/5N2/3Q4/4K3 w - - 0 1").unwrap();
        let history = ButterflyHistory::default();
        let mut picker = MovePicker::new(PackedMove::NONE, [PackedMove::NONE; 2], Vec::new());
        let yielded = drain(&mut picker, &board, &history);
        let good = yielded.iter().position(|m| m == "f3g4").unwrap();
        let bad = yielded.iter().position(|m| m == "d2d6").unwrap();
        assert!(good < bad);
    }

    #[test]
    fn quiescence_generates_noisy_moves_only() {
        let board = Board::from_fen(
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4",
        )
        .unwrap();
        let history = ButterflyHistory::default();
        let mut picker = MovePicker::new_qsearch(PackedMove::NONE, false);
        let yielded = drain(&mut picker, &board, &history);
        assert!(yielded.contains(&"f3e5".to_string()));
        assert!(!yielded.contains(&"e1g1".to_string()));
        assert!(yielded.len() < board.legal_moves().len());
    }

    #[test]
    fn quiescence_in_check_yields_all_evasions() {
        let board =
            Board::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        let history = ButterflyHistory::default();
        let mut picker = MovePicker::new_qsearch(PackedMove::NONE, true);
        let yielded = drain(&mut picker, &board, &history);
        assert_eq!(yielded.len(), board.legal_moves().len());
    }

    #[test]
    fn root_restriction_filters_moves() {
        let board = Board::new();
        let history = ButterflyHistory::default();
        let allowed: Vec<PackedMove> = ["e2e4", "g1f3"]
            .iter()
            .map(|s| PackedMove::pack(&board.parse_uci_move(s).unwrap()))
            .collect();
        let mut picker = MovePicker::new(PackedMove::NONE, [PackedMove::NONE; 2], allowed);
        let mut yielded = drain(&mut picker, &board, &history);
        yielded.sort();
        assert_eq!(yielded, vec!["e2e4".to_string(), "g1f3".to_string()]);
    }
}
