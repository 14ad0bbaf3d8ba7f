//! Per-kind piece movement and threat rules.
//!
//! Every rule here is a pure geometric/obstruction test over the board grid.
//! `threatens` ignores whose turn it is and ignores king safety; `can_move_to`
//! adds the non-threat moves (pawn pushes, en passant, castling);
//! `pseudo_moves` generates the physically possible moves for one piece.
//! King-safety filtering happens one layer up, in `movegen`.

use crate::board::Board;
use crate::types::{CastleSide, CastlingRights, Color, Move, MoveFlags, PieceType, Square};

/// The four diagonal step directions, as (file, rank) deltas.
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// The four straight step directions.
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Knight jump offsets.
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

// ---------------------------------------------------------------------------
// Threat test
// ---------------------------------------------------------------------------

/// Does the piece on `from` threaten `target`?
///
/// A pawn threatens only its two forward diagonals, never the squares it can
/// push to. A king's castling displacement is not a threat. Sliders walk one
/// step at a time and stop at the first occupied square.
pub fn threatens(board: &Board, from: Square, target: Square) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if from == target {
        return false;
    }

    let df = target.file() as i8 - from.file() as i8;
    let dr = target.rank() as i8 - from.rank() as i8;

    match piece.kind {
        PieceType::Pawn => dr == piece.color.forward() && df.abs() == 1,
        PieceType::Knight => KNIGHT_OFFSETS.contains(&(df, dr)),
        PieceType::King => df.abs() <= 1 && dr.abs() <= 1,
        PieceType::Bishop => ray_reaches(board, from, target, &BISHOP_DIRS),
        PieceType::Rook => ray_reaches(board, from, target, &ROOK_DIRS),
        PieceType::Queen => {
            ray_reaches(board, from, target, &BISHOP_DIRS)
                || ray_reaches(board, from, target, &ROOK_DIRS)
        }
    }
}

/// Walk each ray direction from `from`; true if `target` is reached before
/// any blocking piece. The target square itself may be occupied (capture).
fn ray_reaches(board: &Board, from: Square, target: Square, dirs: &[(i8, i8)]) -> bool {
    let df = target.file() as i8 - from.file() as i8;
    let dr = target.rank() as i8 - from.rank() as i8;

    for &(step_f, step_r) in dirs {
        // The target must lie on this ray.
        if (df.signum(), dr.signum()) != (step_f, step_r) {
            continue;
        }
        if step_f != 0 && step_r != 0 && df.abs() != dr.abs() {
            continue;
        }
        let mut sq = from;
        while let Some(next) = sq.offset(step_f, step_r) {
            if next == target {
                return true;
            }
            if board.piece_at(next).is_some() {
                break;
            }
            sq = next;
        }
        return false;
    }
    false
}

// ---------------------------------------------------------------------------
// Full move test (threats + pushes + en passant + castling)
// ---------------------------------------------------------------------------

/// Can the piece on `from` physically move to `target`?
///
/// Defaults to `threatens`. Pawns add the forward advance (one or two squares
/// from the home rank, blocked by occupancy) and the en-passant capture onto
/// the recorded target square; a pawn's diagonal otherwise requires an enemy
/// piece. Kings add the two-file castling displacement.
///
/// Turn order, same-colour occupancy of `target` and king safety are *not*
/// checked here; that is `movegen`'s job.
pub fn can_move_to(board: &Board, from: Square, target: Square) -> bool {
    let Some(piece) = board.piece_at(from) else {
        return false;
    };

    match piece.kind {
        PieceType::Pawn => pawn_can_move_to(board, from, target, piece.color),
        PieceType::King => {
            if threatens(board, from, target) {
                return true;
            }
            king_castle_target(board, from, target, piece.color).is_some()
        }
        _ => threatens(board, from, target),
    }
}

fn pawn_can_move_to(board: &Board, from: Square, target: Square, color: Color) -> bool {
    let forward = color.forward();

    // Diagonal: a real capture or the en-passant target square.
    if threatens(board, from, target) {
        if let Some(victim) = board.piece_at(target) {
            return victim.color != color;
        }
        return board.en_passant == Some(target);
    }

    // Forward advance: same file, empty squares only.
    if target.file() != from.file() {
        return false;
    }
    let one = match from.offset(0, forward) {
        Some(sq) => sq,
        None => return false,
    };
    if board.piece_at(one).is_some() {
        return false;
    }
    if target == one {
        return true;
    }
    if from.rank() == color.pawn_rank() {
        if let Some(two) = from.offset(0, forward * 2) {
            return target == two && board.piece_at(two).is_none();
        }
    }
    false
}

/// If `target` is a legal castling destination for the king on `from`,
/// return the side being castled.
fn king_castle_target(
    board: &Board,
    from: Square,
    target: Square,
    color: Color,
) -> Option<CastleSide> {
    if target.rank() != from.rank() {
        return None;
    }
    let side = match target.file() as i8 - from.file() as i8 {
        2 => CastleSide::King,
        -2 => CastleSide::Queen,
        _ => return None,
    };
    if castling_possible(board, color, side) {
        Some(side)
    } else {
        None
    }
}

/// Castling legality, checked in order: right still held, king not currently
/// in check, all squares strictly between king and rook empty, and no square
/// on the king's path (start, transit, destination) threatened by the
/// opponent.
pub fn castling_possible(board: &Board, color: Color, side: CastleSide) -> bool {
    if !board.castling_rights.has(CastlingRights::flag(color, side)) {
        return false;
    }

    let rank = match color {
        Color::White => 0u8,
        Color::Black => 7u8,
    };

    let (between, king_path): (&[u8], [u8; 3]) = match side {
        CastleSide::King => (&[5, 6], [4, 5, 6]),
        CastleSide::Queen => (&[1, 2, 3], [4, 3, 2]),
    };

    for &file in between {
        if board.piece_at(Square::from_file_rank(file, rank)).is_some() {
            return false;
        }
    }
    for file in king_path {
        if board.is_square_threatened(Square::from_file_rank(file, rank), !color) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Pseudo-legal move generation
// ---------------------------------------------------------------------------

/// Generate the physically possible moves for the piece on `from`,
/// with capture/en-passant/castling/double-push flags and all four
/// promotion variants where a pawn reaches the last rank.
pub fn pseudo_moves(board: &Board, from: Square, moves: &mut Vec<Move>) {
    let Some(piece) = board.piece_at(from) else {
        return;
    };

    match piece.kind {
        PieceType::Pawn => pawn_moves(board, from, piece.color, moves),
        PieceType::Knight => offset_moves(board, from, piece.color, &KNIGHT_OFFSETS, moves),
        PieceType::King => {
            let king_steps: [(i8, i8); 8] = [
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
                (-1, -1),
                (0, -1),
                (1, -1),
            ];
            offset_moves(board, from, piece.color, &king_steps, moves);
            castling_moves(board, from, piece.color, moves);
        }
        PieceType::Bishop => ray_moves(board, from, piece.color, &BISHOP_DIRS, moves),
        PieceType::Rook => ray_moves(board, from, piece.color, &ROOK_DIRS, moves),
        PieceType::Queen => {
            ray_moves(board, from, piece.color, &BISHOP_DIRS, moves);
            ray_moves(board, from, piece.color, &ROOK_DIRS, moves);
        }
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let forward = color.forward();
    let promo_rank = color.promotion_rank();

    // Single and double push.
    if let Some(one) = from.offset(0, forward) {
        if board.piece_at(one).is_none() {
            if one.rank() == promo_rank {
                add_promotions(from, one, MoveFlags::NONE, moves);
            } else {
                moves.push(Move::new(from, one));
            }
            if from.rank() == color.pawn_rank() {
                if let Some(two) = from.offset(0, forward * 2)
                    && board.piece_at(two).is_none()
                {
                    moves.push(Move::with_flags(from, two, MoveFlags::DOUBLE_PUSH));
                }
            }
        }
    }

    // Diagonal captures and en passant.
    for df in [-1i8, 1] {
        let Some(to) = from.offset(df, forward) else {
            continue;
        };
        if let Some(victim) = board.piece_at(to) {
            if victim.color != color {
                if to.rank() == promo_rank {
                    add_promotions(from, to, MoveFlags::CAPTURE, moves);
                } else {
                    moves.push(Move::with_flags(from, to, MoveFlags::CAPTURE));
                }
            }
        } else if board.en_passant == Some(to) {
            moves.push(Move::with_flags(
                from,
                to,
                MoveFlags::CAPTURE | MoveFlags::EN_PASSANT,
            ));
        }
    }
}

/// Add all four promotion variants for a pawn push or capture.
fn add_promotions(from: Square, to: Square, extra_flags: MoveFlags, moves: &mut Vec<Move>) {
    for promo in PieceType::PROMOTIONS {
        moves.push(Move::with_promotion(from, to, promo, extra_flags));
    }
}

fn offset_moves(
    board: &Board,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in offsets {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match board.piece_at(to) {
            Some(p) if p.color == color => {}
            Some(_) => moves.push(Move::with_flags(from, to, MoveFlags::CAPTURE)),
            None => moves.push(Move::new(from, to)),
        }
    }
}

fn ray_moves(
    board: &Board,
    from: Square,
    color: Color,
    dirs: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in dirs {
        let mut sq = from;
        while let Some(to) = sq.offset(df, dr) {
            match board.piece_at(to) {
                None => moves.push(Move::new(from, to)),
                Some(p) => {
                    if p.color != color {
                        moves.push(Move::with_flags(from, to, MoveFlags::CAPTURE));
                    }
                    break;
                }
            }
            sq = to;
        }
    }
}

fn castling_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let home_rank = match color {
        Color::White => 0,
        Color::Black => 7,
    };
    if from != Square::from_file_rank(4, home_rank) {
        return;
    }
    if castling_possible(board, color, CastleSide::King) {
        moves.push(Move::with_flags(
            from,
            Square::from_file_rank(6, home_rank),
            MoveFlags::CASTLING,
        ));
    }
    if castling_possible(board, color, CastleSide::Queen) {
        moves.push(Move::with_flags(
            from,
            Square::from_file_rank(2, home_rank),
            MoveFlags::CASTLING,
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn pos(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    // -------------------------------------------------------------------
    // Threat patterns
    // -------------------------------------------------------------------

    #[test]
    fn pawn_threatens_diagonals_only() {
        let b = pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert!(threatens(&b, sq("e2"), sq("d3")));
        assert!(threatens(&b, sq("e2"), sq("f3")));
        // The push squares are not threats.
        assert!(!threatens(&b, sq("e2"), sq("e3")));
        assert!(!threatens(&b, sq("e2"), sq("e4")));
    }

    #[test]
    fn black_pawn_threatens_downward() {
        let b = pos("4k3/4p3/8/8/8/8/8/4K3 b - - 0 1");
        assert!(threatens(&b, sq("e7"), sq("d6")));
        assert!(threatens(&b, sq("e7"), sq("f6")));
        assert!(!threatens(&b, sq("e7"), sq("d8")));
    }

    #[test]
    fn knight_threat_pattern() {
        let b = pos("4k3/8/8/8/3N4/8/8/4K3 w - - 0 1");
        for name in ["b3", "b5", "c2", "c6", "e2", "e6", "f3", "f5"] {
            assert!(threatens(&b, sq("d4"), sq(name)), "knight should hit {name}");
        }
        assert!(!threatens(&b, sq("d4"), sq("d5")));
    }

    #[test]
    fn slider_blocked_by_intermediate_piece() {
        let b = pos("4k3/8/8/8/3p4/8/1B6/4K3 w - - 0 1");
        // Bishop b2 sees c3 and d4 (capture), but not e5 beyond the pawn.
        assert!(threatens(&b, sq("b2"), sq("c3")));
        assert!(threatens(&b, sq("b2"), sq("d4")));
        assert!(!threatens(&b, sq("b2"), sq("e5")));
    }

    #[test]
    fn rook_threat_along_rank_and_file() {
        let b = pos("4k3/8/8/8/R6p/8/8/4K3 w - - 0 1");
        assert!(threatens(&b, sq("a4"), sq("h4")));
        assert!(threatens(&b, sq("a4"), sq("a8")));
        assert!(!threatens(&b, sq("a4"), sq("b5")));
    }

    #[test]
    fn queen_is_bishop_union_rook() {
        let b = pos("4k3/8/8/8/3Q4/8/8/4K3 w - - 0 1");
        assert!(threatens(&b, sq("d4"), sq("d8")));
        assert!(threatens(&b, sq("d4"), sq("h8")));
        assert!(threatens(&b, sq("d4"), sq("a1")));
        assert!(!threatens(&b, sq("d4"), sq("e6")));
    }

    #[test]
    fn king_threatens_adjacent_not_castle_squares() {
        let b = pos("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(threatens(&b, sq("e1"), sq("d1")));
        assert!(threatens(&b, sq("e1"), sq("f2")));
        // Castling displacement is not a threat.
        assert!(!threatens(&b, sq("e1"), sq("g1")));
        assert!(!threatens(&b, sq("e1"), sq("c1")));
    }

    // -------------------------------------------------------------------
    // can_move_to
    // -------------------------------------------------------------------

    #[test]
    fn pawn_forward_moves() {
        let b = pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert!(can_move_to(&b, sq("e2"), sq("e3")));
        assert!(can_move_to(&b, sq("e2"), sq("e4")));
        // Empty diagonal is not a move.
        assert!(!can_move_to(&b, sq("e2"), sq("d3")));
    }

    #[test]
    fn pawn_double_push_blocked() {
        let b = pos("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1");
        assert!(!can_move_to(&b, sq("e2"), sq("e3")));
        assert!(!can_move_to(&b, sq("e2"), sq("e4")));
    }

    #[test]
    fn pawn_double_push_only_from_home_rank() {
        let b = pos("4k3/8/8/8/8/4P3/8/4K3 w - - 0 1");
        assert!(can_move_to(&b, sq("e3"), sq("e4")));
        assert!(!can_move_to(&b, sq("e3"), sq("e5")));
    }

    #[test]
    fn pawn_en_passant_target() {
        // Black just played d7-d5; white pawn on e5 may capture onto d6.
        let b = pos("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        assert!(can_move_to(&b, sq("e5"), sq("d6")));
        assert!(!can_move_to(&b, sq("e5"), sq("f6")));
    }

    #[test]
    fn king_castle_via_can_move_to() {
        let b = pos("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(can_move_to(&b, sq("e1"), sq("g1")));
        assert!(can_move_to(&b, sq("e1"), sq("c1")));
    }

    // -------------------------------------------------------------------
    // Castling legality
    // -------------------------------------------------------------------

    #[test]
    fn castling_requires_right() {
        let b = pos("4k3/8/8/8/8/8/8/R3K2R w K - 0 1");
        assert!(castling_possible(&b, Color::White, CastleSide::King));
        assert!(!castling_possible(&b, Color::White, CastleSide::Queen));
    }

    #[test]
    fn castling_blocked_by_piece() {
        let b = pos("4k3/8/8/8/8/8/8/R2QK1NR w KQ - 0 1");
        assert!(!castling_possible(&b, Color::White, CastleSide::King));
        assert!(!castling_possible(&b, Color::White, CastleSide::Queen));
    }

    #[test]
    fn castling_forbidden_while_in_check() {
        let b = pos("4k3/8/8/8/8/8/4r3/R3K2R w KQ - 0 1");
        assert!(!castling_possible(&b, Color::White, CastleSide::King));
        assert!(!castling_possible(&b, Color::White, CastleSide::Queen));
    }

    #[test]
    fn castling_through_threatened_square_forbidden() {
        // Rook on f8 covers f1: kingside transit is threatened, queenside fine.
        let b = pos("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(!castling_possible(&b, Color::White, CastleSide::King));
        assert!(castling_possible(&b, Color::White, CastleSide::Queen));
    }

    #[test]
    fn queenside_b_file_may_be_threatened() {
        // b1 under attack does not stop queenside castling; only c1/d1/e1 matter.
        let b = pos("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1");
        assert!(castling_possible(&b, Color::White, CastleSide::Queen));
    }

    // -------------------------------------------------------------------
    // Pseudo move generation
    // -------------------------------------------------------------------

    fn moves_from(b: &Board, from: &str) -> Vec<Move> {
        let mut out = Vec::new();
        pseudo_moves(b, sq(from), &mut out);
        out
    }

    #[test]
    fn pawn_generates_pushes() {
        let b = pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        let moves = moves_from(&b, "e2");
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().any(|m| m.to == sq("e4") && m.flags.is_double_push()));
    }

    #[test]
    fn pawn_generates_promotions() {
        let b = pos("7k/4P3/8/8/8/8/8/4K3 w - - 0 1");
        let moves = moves_from(&b, "e7");
        assert_eq!(moves.len(), 4);
        assert!(moves.iter().all(|m| m.promotion.is_some()));
    }

    #[test]
    fn pawn_generates_en_passant() {
        let b = pos("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        let moves = moves_from(&b, "e5");
        let ep: Vec<_> = moves.iter().filter(|m| m.flags.is_en_passant()).collect();
        assert_eq!(ep.len(), 1);
        assert_eq!(ep[0].to, sq("d6"));
    }

    #[test]
    fn knight_in_corner_has_two_moves() {
        let b = pos("4k3/8/8/8/8/8/8/N3K3 w - - 0 1");
        assert_eq!(moves_from(&b, "a1").len(), 2);
    }

    #[test]
    fn slider_stops_at_capture() {
        let b = pos("4k3/8/8/8/3p4/8/1B6/4K3 w - - 0 1");
        let moves = moves_from(&b, "b2");
        assert!(moves.iter().any(|m| m.to == sq("d4") && m.flags.is_capture()));
        assert!(!moves.iter().any(|m| m.to == sq("e5")));
    }

    #[test]
    fn king_generates_castling_moves() {
        let b = pos("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let moves = moves_from(&b, "e1");
        let castles: Vec<_> = moves.iter().filter(|m| m.flags.is_castling()).collect();
        assert_eq!(castles.len(), 2);
    }
}
