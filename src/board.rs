//! Grid-based chess position representation.
//!
//! `Board` stores piece placement as an 8×8 grid of optional piece slots
//! (indexed LERF: a1 = 0, h8 = 63), side to move, castling rights, the
//! en-passant target square and the move counters. Moves are applied with an
//! explicit `UndoInfo` record so a speculative move can always be rolled
//! back, including on early-return paths.

use tracing::warn;

use crate::piece;
use crate::types::{
    CastleSide, CastlingRights, ChessError, Color, Move, Piece, PieceType, Square,
};

// ---------------------------------------------------------------------------
// UndoInfo — saved state for reversing a move
// ---------------------------------------------------------------------------

/// State that must be saved before making a move so it can be restored on undo.
#[derive(Clone, Debug)]
pub struct UndoInfo {
    /// Captured piece kind and the square it stood on (differs from the
    /// destination for en passant).
    pub captured: Option<(PieceType, Square)>,
    pub castling_rights: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u16,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// A complete chess position.
#[derive(Clone)]
pub struct Board {
    /// One slot per square; a slot owns its piece exclusively.
    grid: [Option<Piece>; 64],

    /// Whose turn it is.
    pub side_to_move: Color,

    /// Castling availability (K/Q/k/q).
    pub castling_rights: CastlingRights,

    /// En-passant target square (the square *behind* the double-pushed pawn).
    pub en_passant: Option<Square>,

    /// Half-move clock for the 50-move rule (reset on pawn move or capture).
    pub halfmove_clock: u16,

    /// Full-move number (starts at 1, incremented after Black moves).
    pub fullmove_number: u16,
}

// ---------------------------------------------------------------------------
// Construction and piece manipulation
// ---------------------------------------------------------------------------

impl Board {
    /// Create an empty board with no pieces.
    pub fn empty() -> Self {
        Board {
            grid: [None; 64],
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Standard starting position.
    pub fn starting() -> Self {
        Self::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("starting FEN is always valid")
    }

    /// What piece (if any) is on a given square?
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.grid[sq.0 as usize]
    }

    /// Place a piece on a square, replacing whatever was there.
    #[inline]
    pub fn put_piece(&mut self, sq: Square, piece: Piece) {
        self.grid[sq.0 as usize] = Some(piece);
    }

    /// Remove and return the piece on a square.
    #[inline]
    pub fn take_piece(&mut self, sq: Square) -> Option<Piece> {
        self.grid[sq.0 as usize].take()
    }

    /// Find the king square for the given colour.
    pub fn king_sq(&self, color: Color) -> Square {
        Square::all()
            .find(|&sq| self.piece_at(sq) == Some(Piece::new(color, PieceType::King)))
            .expect("king must exist")
    }

    /// All squares occupied by pieces of `color`.
    pub fn squares_of(&self, color: Color) -> Vec<Square> {
        Square::all()
            .filter(|&sq| self.piece_at(sq).is_some_and(|p| p.color == color))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Threat detection
    // -----------------------------------------------------------------------

    /// Is `sq` threatened by any piece of colour `by`? Exhaustive O(64) scan;
    /// fine for a fixed 8×8 board.
    pub fn is_square_threatened(&self, sq: Square, by: Color) -> bool {
        Square::all().any(|from| {
            self.piece_at(from).is_some_and(|p| p.color == by) && piece::threatens(self, from, sq)
        })
    }

    /// Is the given colour's king currently in check?
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_threatened(self.king_sq(color), !color)
    }

    /// Full castling legality for one colour and side.
    pub fn is_castling_possible(&self, color: Color, side: CastleSide) -> bool {
        piece::castling_possible(self, color, side)
    }

    // -----------------------------------------------------------------------
    // Make / Undo move
    // -----------------------------------------------------------------------

    /// Apply a move to the position. Returns `UndoInfo` for reversal.
    ///
    /// The caller is responsible for ensuring the move is physically legal;
    /// king safety is checked one layer up by speculatively applying the
    /// move and rolling it back.
    pub fn make_move(&mut self, mv: Move) -> UndoInfo {
        let us = self.side_to_move;

        let undo = UndoInfo {
            captured: None, // updated below if capture
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
        };

        // ---- Handle capture ----
        let mut captured = None;
        if mv.flags.is_en_passant() {
            // The captured pawn is behind the target square.
            let cap_sq = mv
                .to
                .offset(0, -us.forward())
                .expect("en passant capture square on board");
            self.take_piece(cap_sq);
            captured = Some((PieceType::Pawn, cap_sq));
        } else if let Some(victim) = self.piece_at(mv.to) {
            captured = Some((victim.kind, mv.to));
        }

        // ---- Relocate the piece (promotion replaces the kind) ----
        let moving = self
            .take_piece(mv.from)
            .expect("make_move: no piece on from square");
        let landing_kind = mv.promotion.unwrap_or(moving.kind);
        self.put_piece(mv.to, Piece::new(us, landing_kind));

        // ---- Castling: move the rook ----
        if mv.flags.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(mv.to);
            if let Some(rook) = self.take_piece(rook_from) {
                self.put_piece(rook_to, rook);
            }
        }

        // ---- Update castling rights ----
        // Moving king or rook, or capturing on a rook's home square,
        // permanently clears the corresponding right.
        self.castling_rights.0 &= CASTLING_MASK[mv.from.0 as usize];
        self.castling_rights.0 &= CASTLING_MASK[mv.to.0 as usize];

        // ---- En-passant target lifecycle ----
        self.en_passant = if mv.flags.is_double_push() {
            mv.from.offset(0, us.forward())
        } else {
            None
        };

        // ---- Halfmove clock ----
        if moving.kind == PieceType::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        // ---- Fullmove number ----
        if us == Color::Black {
            self.fullmove_number += 1;
        }

        // ---- Switch side ----
        self.side_to_move = !us;

        UndoInfo { captured, ..undo }
    }

    /// Reverse a move previously applied with `make_move`.
    pub fn undo_move(&mut self, mv: Move, undo: &UndoInfo) {
        let us = !self.side_to_move; // side that made the move

        self.side_to_move = us;

        // ---- Put the mover back (a promoted piece reverts to a pawn) ----
        let landed = self
            .take_piece(mv.to)
            .expect("undo_move: no piece on to square");
        let original_kind = if mv.promotion.is_some() {
            PieceType::Pawn
        } else {
            landed.kind
        };
        self.put_piece(mv.from, Piece::new(us, original_kind));

        // ---- Restore capture ----
        if let Some((kind, sq)) = undo.captured {
            self.put_piece(sq, Piece::new(!us, kind));
        }

        // ---- Undo castling: move the rook back ----
        if mv.flags.is_castling() {
            let (rook_from, rook_to) = castling_rook_squares(mv.to);
            if let Some(rook) = self.take_piece(rook_to) {
                self.put_piece(rook_from, rook);
            }
        }

        // ---- Restore saved state ----
        self.castling_rights = undo.castling_rights;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Castling helpers (free functions)
// ---------------------------------------------------------------------------

/// For a king-destination square (after castling), return (rook_from, rook_to).
pub(crate) fn castling_rook_squares(king_to: Square) -> (Square, Square) {
    match king_to.0 {
        // White kingside: king e1→g1, rook h1→f1.
        6 => (Square(7), Square(5)),
        // White queenside: king e1→c1, rook a1→d1.
        2 => (Square(0), Square(3)),
        // Black kingside: king e8→g8, rook h8→f8.
        62 => (Square(63), Square(61)),
        // Black queenside: king e8→c8, rook a8→d8.
        58 => (Square(56), Square(59)),
        _ => panic!("invalid castling king destination: {king_to}"),
    }
}

/// Mask table indexed by square index. When a move touches a square, AND the
/// castling rights with this mask. E.g. if a rook on a1 moves (or is
/// captured), remove White-queenside. The king's home square removes both
/// of that side's rights.
#[rustfmt::skip]
const CASTLING_MASK: [u8; 64] = {
    let mut mask = [0b1111u8; 64];
    mask[0]  = 0b1111 & !CastlingRights::WHITE_QUEENSIDE;
    mask[4]  = 0b1111 & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE);
    mask[7]  = 0b1111 & !CastlingRights::WHITE_KINGSIDE;
    mask[56] = 0b1111 & !CastlingRights::BLACK_QUEENSIDE;
    mask[60] = 0b1111 & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE);
    mask[63] = 0b1111 & !CastlingRights::BLACK_KINGSIDE;
    mask
};

// ---------------------------------------------------------------------------
// FEN parsing & generation
// ---------------------------------------------------------------------------

impl Board {
    /// Parse a FEN string into a `Board`.
    ///
    /// Validates all 6 fields and ensures exactly one king per side. A
    /// castling letter whose king or rook is not on its home square is
    /// silently dropped (permissive, matching common FEN consumers); a
    /// *duplicated* castling letter is an error.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ChessError::InvalidFen(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }

        let mut board = Board::empty();

        // ----- Field 1: Piece placement -----
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessError::InvalidFen(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as u8; // FEN starts from rank 8
            let mut file: u8 = 0;
            for ch in rank_str.chars() {
                if file > 7 {
                    return Err(ChessError::InvalidFen(format!(
                        "too many squares in rank {}",
                        rank + 1
                    )));
                }
                if let Some(digit) = ch.to_digit(10) {
                    if !(1..=8).contains(&digit) {
                        return Err(ChessError::InvalidFen(format!(
                            "invalid empty count '{ch}' in rank {}",
                            rank + 1
                        )));
                    }
                    file += digit as u8;
                } else if let Some((color, kind)) = PieceType::from_char(ch) {
                    board.put_piece(Square::from_file_rank(file, rank), Piece::new(color, kind));
                    file += 1;
                } else {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid character '{ch}' in piece placement"
                    )));
                }
            }
            if file != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "rank {} has {} squares instead of 8",
                    rank + 1,
                    file
                )));
            }
        }

        // Validate exactly one king per side.
        for color in [Color::White, Color::Black] {
            let king_count = Square::all()
                .filter(|&sq| board.piece_at(sq) == Some(Piece::new(color, PieceType::King)))
                .count();
            if king_count != 1 {
                return Err(ChessError::InvalidFen(format!(
                    "{color} has {king_count} kings (expected 1)"
                )));
            }
        }

        // ----- Field 2: Side to move -----
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessError::InvalidFen(format!(
                    "invalid side to move: '{other}'"
                )));
            }
        };

        // ----- Field 3: Castling availability -----
        board.castling_rights = board.parse_castling_field(fields[2])?;

        // ----- Field 4: En passant target square -----
        if fields[3] != "-" {
            let ep_sq = Square::from_algebraic(fields[3]).ok_or_else(|| {
                ChessError::InvalidFen(format!("invalid en passant square: '{}'", fields[3]))
            })?;
            // Must be on rank 3 (white pushed) or rank 6 (black pushed).
            let rank = ep_sq.rank();
            if rank != 2 && rank != 5 {
                return Err(ChessError::InvalidFen(format!(
                    "en passant square {} is not on rank 3 or 6",
                    fields[3]
                )));
            }
            board.en_passant = Some(ep_sq);
        }

        // ----- Field 5: Halfmove clock -----
        board.halfmove_clock = fields[4].parse::<u16>().map_err(|_| {
            ChessError::InvalidFen(format!("invalid halfmove clock: '{}'", fields[4]))
        })?;

        // ----- Field 6: Fullmove number -----
        board.fullmove_number = fields[5].parse::<u16>().map_err(|_| {
            ChessError::InvalidFen(format!("invalid fullmove number: '{}'", fields[5]))
        })?;
        if board.fullmove_number == 0 {
            return Err(ChessError::InvalidFen(
                "fullmove number must be >= 1".to_string(),
            ));
        }

        Ok(board)
    }

    /// Parse the castling field, cross-checking each claimed right against
    /// the piece placement. Duplicated letters are an error; rights whose
    /// king/rook are not at home are dropped with a warning.
    fn parse_castling_field(&self, field: &str) -> Result<CastlingRights, ChessError> {
        if field == "-" {
            return Ok(CastlingRights::NONE);
        }

        let mut seen = 0u8;
        let mut rights = CastlingRights::NONE;
        for c in field.chars() {
            let (flag, color, side) = match c {
                'K' => (CastlingRights::WHITE_KINGSIDE, Color::White, CastleSide::King),
                'Q' => (CastlingRights::WHITE_QUEENSIDE, Color::White, CastleSide::Queen),
                'k' => (CastlingRights::BLACK_KINGSIDE, Color::Black, CastleSide::King),
                'q' => (CastlingRights::BLACK_QUEENSIDE, Color::Black, CastleSide::Queen),
                _ => {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid castling character '{c}'"
                    )));
                }
            };
            if seen & flag != 0 {
                return Err(ChessError::InvalidFen(format!(
                    "duplicated castling character '{c}'"
                )));
            }
            seen |= flag;

            if self.castling_pieces_at_home(color, side) {
                rights.0 |= flag;
            } else {
                warn!("dropping castling right '{c}': king/rook not on home squares");
            }
        }
        Ok(rights)
    }

    /// Are the king and the relevant rook on their home squares?
    fn castling_pieces_at_home(&self, color: Color, side: CastleSide) -> bool {
        let rank = match color {
            Color::White => 0,
            Color::Black => 7,
        };
        let rook_file = match side {
            CastleSide::King => 7,
            CastleSide::Queen => 0,
        };
        self.piece_at(Square::from_file_rank(4, rank))
            == Some(Piece::new(color, PieceType::King))
            && self.piece_at(Square::from_file_rank(rook_file, rank))
                == Some(Piece::new(color, PieceType::Rook))
    }

    /// Export the position as a FEN string.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);

        // ----- Field 1: Piece placement -----
        for rank in (0..8).rev() {
            let mut empty_count = 0u8;
            for file in 0..8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some(piece) => {
                        if empty_count > 0 {
                            fen.push((b'0' + empty_count) as char);
                            empty_count = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => {
                        empty_count += 1;
                    }
                }
            }
            if empty_count > 0 {
                fen.push((b'0' + empty_count) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        // ----- Field 2: Side to move -----
        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        // ----- Field 3: Castling -----
        fen.push(' ');
        fen.push_str(&self.castling_rights.to_fen());

        // ----- Field 4: En passant -----
        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }

        // ----- Field 5: Halfmove clock -----
        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());

        // ----- Field 6: Fullmove number -----
        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }

    // -----------------------------------------------------------------------
    // Board display (8×8 text grid)
    // -----------------------------------------------------------------------

    /// Render the board as an 8-line string (rank 8 at top), useful for
    /// debugging.
    pub fn board_string(&self) -> String {
        let mut s = String::with_capacity(200);
        for rank in (0..8).rev() {
            s.push((b'1' + rank) as char);
            s.push(' ');
            for file in 0..8 {
                let sq = Square::from_file_rank(file, rank);
                let ch = match self.piece_at(sq) {
                    Some(p) => p.to_char(),
                    None => '.',
                };
                s.push(ch);
                if file < 7 {
                    s.push(' ');
                }
            }
            s.push('\n');
        }
        s.push_str("  a b c d e f g h");
        s
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.board_string())
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Board({})", self.to_fen())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MoveFlags;

    fn starting() -> Board {
        Board::starting()
    }

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    // ===================================================================
    // Starting position
    // ===================================================================

    #[test]
    fn starting_position_fen() {
        assert_eq!(
            starting().to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn starting_position_fields() {
        let b = starting();
        assert_eq!(b.side_to_move, Color::White);
        assert_eq!(b.castling_rights, CastlingRights::ALL);
        assert_eq!(b.en_passant, None);
        assert_eq!(b.halfmove_clock, 0);
        assert_eq!(b.fullmove_number, 1);
    }

    #[test]
    fn piece_at_starting_squares() {
        let b = starting();
        assert_eq!(
            b.piece_at(sq("e1")),
            Some(Piece::new(Color::White, PieceType::King))
        );
        assert_eq!(
            b.piece_at(sq("d8")),
            Some(Piece::new(Color::Black, PieceType::Queen))
        );
        assert_eq!(b.piece_at(sq("e4")), None);
        for file in b'a'..=b'h' {
            let name = format!("{}2", file as char);
            assert_eq!(
                b.piece_at(sq(&name)),
                Some(Piece::new(Color::White, PieceType::Pawn)),
                "expected white pawn on {name}"
            );
        }
    }

    #[test]
    fn king_sq_starting() {
        let b = starting();
        assert_eq!(b.king_sq(Color::White), sq("e1"));
        assert_eq!(b.king_sq(Color::Black), sq("e8"));
    }

    #[test]
    fn squares_of_counts() {
        let b = starting();
        assert_eq!(b.squares_of(Color::White).len(), 16);
        assert_eq!(b.squares_of(Color::Black).len(), 16);
    }

    // ===================================================================
    // Threat detection
    // ===================================================================

    #[test]
    fn starting_position_threats() {
        let b = starting();
        // e3 is covered by white pawns d2/f2.
        assert!(b.is_square_threatened(sq("e3"), Color::White));
        // e4 is covered by nobody.
        assert!(!b.is_square_threatened(sq("e4"), Color::White));
        assert!(!b.is_in_check(Color::White));
        assert!(!b.is_in_check(Color::Black));
    }

    #[test]
    fn check_detected() {
        let b = Board::from_fen("4k3/8/8/8/8/8/8/4K2r w - - 0 1").unwrap();
        assert!(b.is_in_check(Color::White));
        assert!(!b.is_in_check(Color::Black));
    }

    // ===================================================================
    // Make / undo
    // ===================================================================

    #[test]
    fn make_move_e2e4() {
        let mut b = starting();
        b.make_move(Move::with_flags(sq("e2"), sq("e4"), MoveFlags::DOUBLE_PUSH));
        assert_eq!(
            b.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn make_undo_restores_fen() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let b = Board::from_fen(fen).unwrap();
        for mv in crate::movegen::legal_moves(&b) {
            let mut copy = b.clone();
            let undo = copy.make_move(mv);
            copy.undo_move(mv, &undo);
            assert_eq!(copy.to_fen(), fen, "FEN mismatch after make/undo of {mv}");
        }
    }

    #[test]
    fn capture_resets_halfmove_clock() {
        let mut b = Board::from_fen("4k3/8/8/3p4/4N3/8/8/4K3 w - - 7 12").unwrap();
        b.make_move(Move::with_flags(sq("e4"), sq("d5"), MoveFlags::CAPTURE));
        assert_eq!(b.halfmove_clock, 0);
    }

    #[test]
    fn quiet_piece_move_increments_clock() {
        let mut b = Board::from_fen("4k3/8/8/8/4N3/8/8/4K3 w - - 7 12").unwrap();
        b.make_move(Move::new(sq("e4"), sq("d6")));
        assert_eq!(b.halfmove_clock, 8);
    }

    #[test]
    fn castling_relocates_rook_and_clears_rights() {
        let mut b = Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        b.make_move(Move::with_flags(sq("e1"), sq("g1"), MoveFlags::CASTLING));
        assert_eq!(
            b.piece_at(sq("f1")),
            Some(Piece::new(Color::White, PieceType::Rook))
        );
        assert_eq!(b.piece_at(sq("h1")), None);
        assert!(!b.castling_rights.can_castle(Color::White, CastleSide::King));
        assert!(!b.castling_rights.can_castle(Color::White, CastleSide::Queen));
        assert!(b.castling_rights.can_castle(Color::Black, CastleSide::King));
    }

    #[test]
    fn rook_move_clears_one_right() {
        let mut b = Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        b.make_move(Move::new(sq("h1"), sq("g1")));
        assert!(!b.castling_rights.can_castle(Color::White, CastleSide::King));
        assert!(b.castling_rights.can_castle(Color::White, CastleSide::Queen));
    }

    #[test]
    fn en_passant_capture_removes_right_pawn() {
        // Black just played d7-d5; white pawn on e5 captures onto d6.
        let mut b =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3")
                .unwrap();
        let undo = b.make_move(Move::with_flags(
            sq("e5"),
            sq("d6"),
            MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
        ));
        assert_eq!(b.piece_at(sq("d5")), None, "captured pawn was on d5");
        assert_eq!(
            b.piece_at(sq("d6")),
            Some(Piece::new(Color::White, PieceType::Pawn))
        );
        assert_eq!(undo.captured, Some((PieceType::Pawn, sq("d5"))));
    }

    #[test]
    fn promotion_replaces_pawn() {
        let mut b = Board::from_fen("7k/4P3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mv = Move::with_promotion(sq("e7"), sq("e8"), PieceType::Queen, MoveFlags::NONE);
        let undo = b.make_move(mv);
        assert_eq!(
            b.piece_at(sq("e8")),
            Some(Piece::new(Color::White, PieceType::Queen))
        );
        b.undo_move(mv, &undo);
        assert_eq!(
            b.piece_at(sq("e7")),
            Some(Piece::new(Color::White, PieceType::Pawn))
        );
        assert_eq!(b.piece_at(sq("e8")), None);
    }

    // ===================================================================
    // FEN parsing
    // ===================================================================

    #[test]
    fn fen_round_trip_known_positions() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w Kq - 5 20",
        ] {
            let b = Board::from_fen(fen).unwrap();
            assert_eq!(b.to_fen(), fen);
        }
    }

    #[test]
    fn fen_error_wrong_field_count() {
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -").is_err());
    }

    #[test]
    fn fen_error_wrong_rank_count() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_invalid_piece_char() {
        assert!(
            Board::from_fen("xnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_rank_too_long() {
        assert!(
            Board::from_fen("rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_invalid_side_to_move() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_unknown_castling_letter() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w XYZ - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_duplicated_castling_letter() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KKqk - 0 1").is_err()
        );
    }

    #[test]
    fn fen_inconsistent_castling_right_is_dropped() {
        // White king not on e1: the claimed K/Q rights are physically
        // impossible and get dropped instead of erroring.
        let b = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1KNR w KQkq - 0 1").unwrap();
        assert!(!b.castling_rights.can_castle(Color::White, CastleSide::King));
        assert!(!b.castling_rights.can_castle(Color::White, CastleSide::Queen));
        assert!(b.castling_rights.can_castle(Color::Black, CastleSide::King));
        assert!(b.castling_rights.can_castle(Color::Black, CastleSide::Queen));
    }

    #[test]
    fn fen_error_invalid_ep_square() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq z9 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_ep_wrong_rank() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e4 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_invalid_halfmove() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - abc 1").is_err()
        );
    }

    #[test]
    fn fen_error_fullmove_zero() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0").is_err()
        );
    }

    #[test]
    fn fen_error_no_white_king() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQ1BNR w KQkq - 0 1").is_err()
        );
    }

    #[test]
    fn fen_error_two_white_kings() {
        assert!(
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBKKBNR w KQkq - 0 1").is_err()
        );
    }

    // ===================================================================
    // board_string display
    // ===================================================================

    #[test]
    fn board_string_starting() {
        let s = starting().board_string();
        assert!(s.starts_with("8 r n b q k b n r"));
        assert!(s.ends_with("a b c d e f g h"));
    }
}
