//! Static exchange evaluation.
//!
//! Threshold form: answers "does this capture win at least `threshold`
//! centipawns after the full swap-off" without running the search.

use shakmaty::{attacks, Bitboard, Color, Move, Position, Role, Square};

use super::Board;

/// Swap-off values indexed by [`Role`] (1-based, slot 0 unused).
pub const SEE_VALUES: [i32; 7] = [0, 100, 300, 300, 500, 900, 20_000];

impl Board {
    /// True when the swap-off value of `mv` is at least `threshold`.
    pub fn see(&self, mv: &Move, threshold: i32) -> bool {
        // castling never wins or loses material
        if let Move::Castle { .. } = mv {
            return threshold <= 0;
        }
        let from = match mv.from() {
            Some(sq) => sq,
            None => return false,
        };
        let target = mv.to();
        let board = self.pos.board();

        let first_gain = if mv.is_en_passant() {
            SEE_VALUES[Role::Pawn as usize]
        } else {
            board
                .role_at(target)
                .map(|r| SEE_VALUES[r as usize])
                .unwrap_or(0)
        };

        // if the initial capture doesn't beat the threshold then we fail
        // early, the opponent can simply not recapture
        let mut value = first_gain - threshold;
        if value < 0 {
            return false;
        }

        // if we still beat the threshold after losing the moved piece for
        // nothing we succeed early
        value -= SEE_VALUES[mv.role() as usize];
        if value >= 0 {
            return true;
        }

        let mut occupied = (board.occupied() ^ Bitboard::from(from)) | Bitboard::from(target);
        if mv.is_en_passant() {
            occupied ^= Bitboard::from(Square::from_coords(target.file(), from.rank()));
        }

        let diagonal = board.by_role(Role::Bishop) | board.by_role(Role::Queen);
        let orthogonal = board.by_role(Role::Rook) | board.by_role(Role::Queen);

        let mut attackers = (board.attacks_to(target, Color::White, occupied)
            | board.attacks_to(target, Color::Black, occupied))
            & occupied;

        let mut stm = !self.pos.turn();

        loop {
            attackers &= occupied;
            let our_attackers = attackers & board.by_color(stm);

            // side to capture ran out of attackers
            if our_attackers.is_empty() {
                break;
            }

            // take with the least valuable piece first
            let mut attacker = Role::King;
            let mut attacker_sq = None;
            for role in [
                Role::Pawn,
                Role::Knight,
                Role::Bishop,
                Role::Rook,
                Role::Queen,
                Role::King,
            ] {
                if let Some(sq) = (our_attackers & board.by_role(role)).first() {
                    attacker = role;
                    attacker_sq = Some(sq);
                    break;
                }
            }
            let attacker_sq = match attacker_sq {
                Some(sq) => sq,
                None => break,
            };

            stm = !stm;

            value = -value - 1 - SEE_VALUES[attacker as usize];
            if value >= 0 {
                // a king capture into remaining enemy attackers is illegal,
                // so the capture fails instead of passing
                if attacker == Role::King && !(attackers & board.by_color(stm)).is_empty() {
                    stm = !stm;
                }
                break;
            }

            occupied ^= Bitboard::from(attacker_sq);

            // sliders behind the used piece join the exchange
            if matches!(attacker, Role::Pawn | Role::Bishop | Role::Queen) {
                attackers |= attacks::bishop_attacks(target, occupied) & diagonal;
            }
            if matches!(attacker, Role::Rook | Role::Queen) {
                attackers |= attacks::rook_attacks(target, occupied) & orthogonal;
            }
        }

        // whoever is due to capture when the exchange stops is the loser
        stm != self.pos.turn()
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;

    fn check(fen: &str, mv: &str, value: i32) {
        let board = Board::from_fen(fen).unwrap();
        let mv = board.parse_uci_move(mv).unwrap();
        assert!(board.see(&mv, value), "{fen} {mv:?} >= {value}");
        assert!(board.see(&mv, value - 10), "{fen} {mv:?} >= {}", value - 10);
        assert!(!board.see(&mv, value + 10), "{fen} {mv:?} < {}", value + 10);
    }

    #[test]
    fn exchange_thresholds() {
        check(
            "1k1r3q/1ppn3p/p4b2/4p3/8/P2N2P1/1PP1R1BP/2K1Q3 w - - 0 1",
            "d3e5",
            -200,
        );
        check("4k3/1n6/8/2n5/3P4/8/8/4K3 w - - 0 1", "d4c5", 200);
        check("2kr4/8/8/8/2pP4/8/3K4/5Q2 b - d3 0 6", "c4d3", 100);
        check("4k3/8/8/4r3/5P2/8/8/4K3 w - - 0 1", "f4e5", 500);
        check("4k3/8/3p4/4n3/8/4R3/8/4K3 w - - 0 1", "e3e5", -200);
        check("4k3/8/1p1p4/2p5/3P4/8/2R5/4K3 w - - 0 1", "d4c5", 0);
        check("4k3/8/1q1p4/2p5/3P4/8/2R5/4K3 w - - 0 1", "c2c5", -400);
        check("4k3/8/1q1p4/2p5/3P4/8/2R5/2Q1K3 w - - 0 1", "d4c5", 100);
        check("4k3/8/1b1p4/2p5/3P4/4B3/5B2/4K3 w - - 0 1", "d4c5", 100);
        check("8/8/8/2pk4/3P4/4P3/8/4K3 b - - 0 1", "c5d4", 100);
        check("1k1rr3/8/8/8/8/8/3Q4/K2R4 w - - 0 1", "d2d8", 100);
        check(
            "rnbqk1nr/pppp1ppp/8/2b1p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 0 1",
            "c4f7",
            -200,
        );
        check("6k1/8/8/RrRrP3/8/8/8/6K1 b - - 0 1", "d5e5", -400);
    }

    #[test]
    fn quiet_moves_stand_on_zero() {
        let board = Board::new();
        let mv = board.parse_uci_move("e2e4").unwrap();
        assert!(board.see(&mv, 0));
        assert!(!board.see(&mv, 10));
    }
}
