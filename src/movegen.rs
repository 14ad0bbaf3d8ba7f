//! Legal move generation.
//!
//! Builds on the pseudo-legal moves from `piece` and filters out every move
//! that would leave the mover's own king in check. The filter is a
//! speculative apply: clone the position, make the move, test king safety.

use crate::board::Board;
use crate::piece;
use crate::types::{Move, Square};

/// All legal moves for the side to move.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    for from in board.squares_of(board.side_to_move) {
        piece::pseudo_moves(board, from, &mut moves);
    }
    moves.retain(|&mv| leaves_king_safe(board, mv));
    moves
}

/// All legal moves for the piece on `from` (empty if the square is empty or
/// holds an opponent piece).
pub fn legal_moves_from(board: &Board, from: Square) -> Vec<Move> {
    let mut moves = Vec::new();
    if board
        .piece_at(from)
        .is_none_or(|p| p.color != board.side_to_move)
    {
        return moves;
    }
    piece::pseudo_moves(board, from, &mut moves);
    moves.retain(|&mv| leaves_king_safe(board, mv));
    moves
}

/// Would this specific move be legal in the current position?
///
/// Checks turn order and physical reachability via the per-kind rules, then
/// the own-king-safety filter. Promotion choice is ignored: a pawn reaching
/// the last rank is legal regardless of which kind it becomes.
pub fn is_move_possible(board: &Board, mv: Move) -> bool {
    let Some(mover) = board.piece_at(mv.from) else {
        return false;
    };
    if mover.color != board.side_to_move {
        return false;
    }
    if let Some(target) = board.piece_at(mv.to) {
        // Own pieces and kings can never be captured.
        if target.color == mover.color || target.kind == crate::types::PieceType::King {
            return false;
        }
    }
    if !piece::can_move_to(board, mv.from, mv.to) {
        return false;
    }
    leaves_king_safe(board, normalize(board, mv))
}

/// Fill in the special-move flags for a bare from/to pair so `make_move`
/// performs the right secondary effects.
pub fn normalize(board: &Board, mv: Move) -> Move {
    let mut out = mv;
    out.flags = crate::types::MoveFlags::NONE;

    let Some(mover) = board.piece_at(mv.from) else {
        return out;
    };

    if board.piece_at(mv.to).is_some() {
        out.flags = out.flags | crate::types::MoveFlags::CAPTURE;
    }

    match mover.kind {
        crate::types::PieceType::Pawn => {
            if board.en_passant == Some(mv.to) && mv.from.file() != mv.to.file() {
                out.flags = out.flags
                    | crate::types::MoveFlags::CAPTURE
                    | crate::types::MoveFlags::EN_PASSANT;
            }
            if (mv.to.rank() as i8 - mv.from.rank() as i8).abs() == 2 {
                out.flags = out.flags | crate::types::MoveFlags::DOUBLE_PUSH;
            }
        }
        crate::types::PieceType::King => {
            if (mv.to.file() as i8 - mv.from.file() as i8).abs() == 2 {
                out.flags = out.flags | crate::types::MoveFlags::CASTLING;
            }
        }
        _ => {}
    }
    out
}

/// Speculatively apply `mv` and check the mover's king is not left in check.
fn leaves_king_safe(board: &Board, mv: Move) -> bool {
    let us = board.side_to_move;
    let mut scratch = board.clone();
    scratch.make_move(mv);
    !scratch.is_in_check(us)
}

/// Does the side to move have any legal move at all? Cheaper than building
/// the full list when only mate/stalemate detection is needed.
pub fn has_legal_moves(board: &Board) -> bool {
    let mut moves = Vec::new();
    for from in board.squares_of(board.side_to_move) {
        piece::pseudo_moves(board, from, &mut moves);
        if moves.iter().any(|&mv| leaves_king_safe(board, mv)) {
            return true;
        }
        moves.clear();
    }
    false
}
