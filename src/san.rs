//! Standard Algebraic Notation.
//!
//! `move_to_san` renders a legal move against the position it is played
//! *from*; disambiguation is computed from the legal-move list of that
//! position, and the `+`/`#` suffix from the position after the move.
//! `parse_san` does the reverse: it matches a SAN token against the current
//! legal moves, ignoring decorations.

use crate::board::Board;
use crate::movegen;
use crate::types::{ChessError, Move, PieceType, Square};

/// Render a move in SAN. The move must be legal in `board`.
pub fn move_to_san(board: &Board, mv: Move) -> String {
    let mut san = String::with_capacity(8);

    if mv.flags.is_castling() {
        san.push_str(if mv.to.file() > mv.from.file() {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        let piece = board
            .piece_at(mv.from)
            .expect("move_to_san: no piece on from square");

        match piece.kind {
            PieceType::Pawn => {
                if mv.flags.is_capture() {
                    san.push((b'a' + mv.from.file()) as char);
                }
            }
            kind => {
                san.push(kind.to_char(crate::types::Color::White));
                san.push_str(&disambiguation(board, mv, kind));
            }
        }

        if mv.flags.is_capture() {
            san.push('x');
        }
        san.push_str(&mv.to.to_algebraic());

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(promo.to_char(crate::types::Color::White));
        }
    }

    // Check / mate suffix from the resulting position.
    let mut after = board.clone();
    after.make_move(mv);
    if after.is_in_check(after.side_to_move) {
        if movegen::has_legal_moves(&after) {
            san.push('+');
        } else {
            san.push('#');
        }
    }

    san
}

/// Minimal disambiguation when another piece of the same kind could also
/// reach the destination: file if it suffices, else rank, else both.
fn disambiguation(board: &Board, mv: Move, kind: PieceType) -> String {
    let rivals: Vec<Square> = movegen::legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_at(other.from).is_some_and(|p| p.kind == kind)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let file_unique = rivals.iter().all(|sq| sq.file() != mv.from.file());
    let rank_unique = rivals.iter().all(|sq| sq.rank() != mv.from.rank());

    if file_unique {
        ((b'a' + mv.from.file()) as char).to_string()
    } else if rank_unique {
        ((b'1' + mv.from.rank()) as char).to_string()
    } else {
        mv.from.to_algebraic()
    }
}

/// Parse a SAN token against the current position's legal moves.
///
/// Decorations are ignored: trailing `+`, `#`, `!`, `?` runs, and an
/// `e.p.` marker. Castling accepts `O-O`/`0-0` forms case-insensitively.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, ChessError> {
    let original = san;
    let mut s = san.trim();

    // Strip decorations from the right.
    if let Some(stripped) = s.strip_suffix("e.p.") {
        s = stripped.trim_end();
    }
    s = s.trim_end_matches(['+', '#', '!', '?']);

    if s.is_empty() {
        return Err(syntax(original, "empty move token"));
    }

    let legal = movegen::legal_moves(board);

    // Castling (case-insensitive, letter O or digit 0).
    let folded: String = s
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            '0' => 'O',
            up => up,
        })
        .collect();
    if folded == "O-O" || folded == "O-O-O" {
        let kingside = folded == "O-O";
        return legal
            .into_iter()
            .find(|m| {
                m.flags.is_castling() && ((m.to.file() > m.from.file()) == kingside)
            })
            .ok_or_else(|| syntax(original, "castling is not legal here"));
    }

    let mut chars: Vec<char> = s.chars().collect();

    // Promotion suffix: "=Q" or bare trailing piece letter ("e8Q").
    let mut promotion = None;
    if chars.len() >= 2 {
        let last = chars[chars.len() - 1];
        if let Some((_, kind)) = PieceType::from_char(last)
            && kind != PieceType::Pawn
            && kind != PieceType::King
            && last.is_ascii_uppercase()
        {
            promotion = Some(kind);
            chars.pop();
            if chars.last() == Some(&'=') {
                chars.pop();
            }
        }
    }

    if chars.len() < 2 {
        return Err(syntax(original, "move token too short"));
    }

    // Destination square: last two characters.
    let to_str: String = chars[chars.len() - 2..].iter().collect();
    let to = Square::from_algebraic(&to_str)
        .ok_or_else(|| syntax(original, "invalid destination square"))?;
    chars.truncate(chars.len() - 2);

    // Leading piece letter (uppercase); pawns have none.
    let mut kind = PieceType::Pawn;
    if let Some(&first) = chars.first()
        && first.is_ascii_uppercase()
        && let Some((_, k)) = PieceType::from_char(first)
    {
        kind = k;
        chars.remove(0);
    }

    // What remains is disambiguation: file, rank, both, and possibly 'x'.
    let mut from_file = None;
    let mut from_rank = None;
    for c in chars {
        match c {
            'x' => {}
            'a'..='h' => from_file = Some(c as u8 - b'a'),
            '1'..='8' => from_rank = Some(c as u8 - b'1'),
            _ => return Err(syntax(original, "unexpected character")),
        }
    }

    let matches: Vec<Move> = legal
        .into_iter()
        .filter(|m| {
            m.to == to
                && board.piece_at(m.from).is_some_and(|p| p.kind == kind)
                && from_file.is_none_or(|f| m.from.file() == f)
                && from_rank.is_none_or(|r| m.from.rank() == r)
                && match (kind, promotion) {
                    (PieceType::Pawn, Some(p)) => m.promotion == Some(p),
                    (PieceType::Pawn, None) => {
                        // Ambiguity between the four promotion variants is
                        // only resolved by an explicit suffix.
                        m.promotion.is_none() || m.promotion == Some(PieceType::Queen)
                    }
                    _ => m.promotion.is_none(),
                }
        })
        .collect();

    match matches.len() {
        0 => Err(syntax(original, "no legal move matches")),
        1 => Ok(matches[0]),
        _ => Err(syntax(original, "ambiguous move")),
    }
}

fn syntax(token: &str, message: &str) -> ChessError {
    ChessError::InvalidMove {
        from: token.to_string(),
        to: String::new(),
        reason: message.to_string(),
    }
}
