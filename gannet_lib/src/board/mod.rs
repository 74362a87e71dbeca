//! Board adapter.
//!
//! The search only needs a narrow contract from the position: hashing,
//! repetition and draw detection, make/unmake with an undo stack, null
//! moves, static exchange evaluation and move generation. Everything
//! else is delegated to `shakmaty`, whose Polyglot-compatible zobrist
//! keys double as the repetition hash.

mod evaluate;
mod see;

pub use evaluate::PIECE_VALUES_EG;

use shakmaty::{
    fen::Fen,
    zobrist::{Zobrist64, ZobristHash},
    CastlingMode, Chess, Color, EnPassantMode, File, Move, MoveList, Position, Role, Square,
};

/// A move squeezed into 16 bits for transposition table storage and the
/// from/to-indexed heuristic tables: 6 bits from, 6 bits to, 3 bits
/// promotion role. Castling moves pack as king-from/rook-to, matching
/// the generator's own encoding, so packing is a bijection on the legal
/// move set of any position.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct PackedMove(u16);

impl PackedMove {
    pub const NONE: PackedMove = PackedMove(0);
    /// Marker for a null move on the search stack, distinct from "no move".
    pub const NULL: PackedMove = PackedMove(0xFFFF);

    pub fn pack(mv: &Move) -> Self {
        let from = mv.from().map(|sq| sq as u16).unwrap_or(0);
        let to = mv.to() as u16;
        let promo = mv.promotion().map(|r| r as u16).unwrap_or(0);
        PackedMove(from | to << 6 | promo << 12)
    }

    #[inline]
    pub fn from_sq(self) -> usize {
        (self.0 & 63) as usize
    }

    #[inline]
    pub fn to_sq(self) -> usize {
        (self.0 >> 6 & 63) as usize
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self.0 != 0 && self != Self::NULL
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Self {
        PackedMove(bits)
    }
}

/// Outcome of the cheap draw classification consulted at every node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DrawState {
    None,
    Drawn,
    Lost,
}

struct Undo {
    pos: Chess,
    hash: u64,
}

pub struct Board {
    pos: Chess,
    hash: u64,
    hash_history: Vec<u64>,
    undo_stack: Vec<Undo>,
}

impl Clone for Board {
    fn clone(&self) -> Self {
        // worker clones start fresh: the undo stack never crosses threads
        Self {
            pos: self.pos.clone(),
            hash: self.hash,
            hash_history: self.hash_history.clone(),
            undo_stack: Vec::new(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self::from_position(Chess::default())
    }

    pub fn from_fen<T: AsRef<str>>(fen: T) -> Option<Self> {
        let setup = Fen::from_ascii(fen.as_ref().as_bytes()).ok()?;
        let pos = setup.into_position(CastlingMode::Standard).ok()?;
        Some(Self::from_position(pos))
    }

    fn from_position(pos: Chess) -> Self {
        let hash = hash_of(&pos);
        Self {
            pos,
            hash,
            hash_history: Vec::new(),
            undo_stack: Vec::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> &Chess {
        &self.pos
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.pos.turn()
    }

    /// 0 for white, 1 for black; used to index the heuristic tables.
    #[inline]
    pub fn stm_index(&self) -> usize {
        if self.pos.turn() == Color::White {
            0
        } else {
            1
        }
    }

    #[inline]
    pub fn half_move_clock(&self) -> u32 {
        self.pos.halfmoves()
    }

    #[inline]
    pub fn hash_key(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.pos.is_check()
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Role> {
        self.pos.board().role_at(sq)
    }

    pub fn occupied_count(&self) -> usize {
        self.pos.board().occupied().count()
    }

    /// Whether `color` still has anything beyond pawns and the king.
    pub fn non_pawn_material(&self, color: Color) -> bool {
        let board = self.pos.board();
        let minors_and_majors = board.by_role(Role::Knight)
            | board.by_role(Role::Bishop)
            | board.by_role(Role::Rook)
            | board.by_role(Role::Queen);
        !(board.by_color(color) & minors_and_majors).is_empty()
    }

    /// How many times the current position occurred before, looking back
    /// no further than the halfmove clock allows.
    pub fn is_repetition(&self, count: usize) -> bool {
        let window = self.pos.halfmoves() as usize + 1;
        self.hash_history
            .iter()
            .rev()
            .take(window)
            .filter(|&&h| h == self.hash)
            .count()
            >= count
    }

    /// Fifty-move and insufficient-material classification. A position
    /// that hits the clock while checkmated is a loss, not a draw.
    pub fn is_drawn(&self, in_check: bool) -> DrawState {
        if self.pos.halfmoves() >= 100 {
            if in_check && self.pos.legal_moves().is_empty() {
                return DrawState::Lost;
            }
            return DrawState::Drawn;
        }
        if self.pos.is_insufficient_material() {
            return DrawState::Drawn;
        }
        DrawState::None
    }

    #[inline]
    pub fn legal_moves(&self) -> MoveList {
        self.pos.legal_moves()
    }

    #[inline]
    pub fn capture_moves(&self) -> MoveList {
        self.pos.capture_moves()
    }

    /// Captures plus quiet queen promotions: everything the quiescence
    /// search considers noisy.
    pub fn noisy_moves(&self) -> MoveList {
        let mut moves = self.pos.capture_moves();
        for mv in self.pos.legal_moves() {
            if !mv.is_capture() && mv.promotion() == Some(Role::Queen) {
                moves.push(mv);
            }
        }
        moves
    }

    pub fn make_move(&mut self, mv: &Move) {
        self.undo_stack.push(Undo {
            pos: self.pos.clone(),
            hash: self.hash,
        });
        self.hash_history.push(self.hash);
        self.pos.play_unchecked(mv);
        self.hash = hash_of(&self.pos);
    }

    pub fn unmake_move(&mut self) {
        if let Some(undo) = self.undo_stack.pop() {
            self.pos = undo.pos;
            self.hash = undo.hash;
            self.hash_history.pop();
        }
    }

    /// Pass the move to the opponent. Fails (and changes nothing) when
    /// the side to move is in check; the null-move guard in the search
    /// never asks in that case.
    pub fn make_null_move(&mut self) -> bool {
        match self.pos.clone().swap_turn() {
            Ok(swapped) => {
                self.undo_stack.push(Undo {
                    pos: self.pos.clone(),
                    hash: self.hash,
                });
                self.hash_history.push(self.hash);
                self.pos = swapped;
                self.hash = hash_of(&self.pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn unmake_null_move(&mut self) {
        self.unmake_move();
    }

    /// Recover the generator's move for a packed 16-bit encoding.
    pub fn find_move(&self, packed: PackedMove) -> Option<Move> {
        if !packed.is_some() {
            return None;
        }
        self.pos
            .legal_moves()
            .into_iter()
            .find(|m| PackedMove::pack(m) == packed)
    }

    /// Standard-notation UCI string for a move of this position.
    pub fn uci(&self, mv: &Move) -> String {
        match mv {
            Move::Castle { king, rook } => {
                let file = if rook > king { File::G } else { File::C };
                format!("{}{}", king, Square::from_coords(file, king.rank()))
            }
            _ => {
                let from = mv.from().map(|sq| sq.to_string()).unwrap_or_default();
                match mv.promotion() {
                    Some(role) => format!("{}{}{}", from, mv.to(), role.char()),
                    None => format!("{}{}", from, mv.to()),
                }
            }
        }
    }

    /// Parse a UCI move string against the current legal moves.
    pub fn parse_uci_move(&self, token: &str) -> Option<Move> {
        self.pos
            .legal_moves()
            .into_iter()
            .find(|m| self.uci(m) == token)
    }
}

fn hash_of(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(board: &mut Board, moves: &[&str]) {
        for token in moves {
            let mv = board.parse_uci_move(token).unwrap();
            board.make_move(&mv);
        }
    }

    #[test]
    fn zobrist_regression() {
        let mut board = Board::new();
        assert_eq!(board.hash_key(), 0x463b96181691fc9c);

        let sequence = [
            ("e2e4", 0x823c9b50fd114196),
            ("d7d5", 0x0756b94461c50fb0),
            ("e4e5", 0x662fafb965db29d4),
            ("f7f5", 0x22a48b5a8e47ff78),
            ("e1e2", 0x652a607ca3f242c1),
            ("e8f7", 0x00fdd303c946bdd9),
        ];
        for (token, expected) in sequence {
            let mv = board.parse_uci_move(token).unwrap();
            board.make_move(&mv);
            assert_eq!(board.hash_key(), expected, "after {token}");
        }
        for _ in 0..sequence.len() {
            board.unmake_move();
        }
        assert_eq!(board.hash_key(), 0x463b96181691fc9c);
    }

    #[test]
    fn zobrist_en_passant_and_castling() {
        let mut board = Board::new();
        play(&mut board, &["a2a4", "b7b5", "h2h4", "b5b4", "c2c4"]);
        assert_eq!(board.hash_key(), 0x3c8123ea7b067637);
        play(&mut board, &["b4c3", "a1a3"]);
        assert_eq!(board.hash_key(), 0x5c3f9b829b279560);
    }

    #[test]
    fn repetition_detection() {
        let mut board = Board::new();
        assert!(!board.is_repetition(1));
        play(
            &mut board,
            &["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"],
        );
        assert!(board.is_repetition(1));
        assert!(board.is_repetition(2));
    }

    #[test]
    fn insufficient_material_draws() {
        for fen in [
            "8/2k1B3/8/8/8/8/2K5/8 w - - 0 1",
            "8/2k1b3/8/8/8/8/2K5/8 w - - 0 1",
            "8/2k1N3/8/8/8/8/2K5/8 w - - 0 1",
            "8/2k1n3/8/8/8/8/2K5/8 w - - 0 1",
            "8/2k5/8/8/8/8/2K5/8 w - - 0 1",
        ] {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.is_drawn(false), DrawState::Drawn, "{fen}");
        }
        // opposite-coloured bishops can still mate
        let board = Board::from_fen("8/2k1b3/8/8/8/5B2/2K5/8 w - - 0 1").unwrap();
        assert_eq!(board.is_drawn(false), DrawState::None);
    }

    #[test]
    fn packed_moves_round_trip() {
        let board = Board::new();
        for mv in board.legal_moves() {
            let packed = PackedMove::pack(&mv);
            assert!(packed.is_some());
            assert_eq!(board.find_move(packed), Some(mv));
        }
    }

    #[test]
    fn null_move_restores_position() {
        let mut board = Board::from_fen("4k3/8/4K3/8/8/8/8/4R3 w - - 0 1").unwrap();
        let hash = board.hash_key();
        assert!(board.make_null_move());
        assert_eq!(board.side_to_move(), Color::Black);
        board.unmake_null_move();
        assert_eq!(board.hash_key(), hash);
    }

    #[test]
    fn castling_uci_notation() {
        let board =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let ucis: Vec<String> = board.legal_moves().iter().map(|m| board.uci(m)).collect();
        assert!(ucis.contains(&"e1g1".to_string()));
        assert!(ucis.contains(&"e1c1".to_string()));
    }
}
