//! # chessbook
//!
//! A chess rules engine and game-notation library. It keeps a legal chess
//! position, generates and validates moves, detects check, checkmate and
//! stalemate, and records a full game as a branching tree of moves (main
//! line plus variations) with navigation, editing, and serialization to and
//! from FEN and PGN.
//!
//! The entry point is [`Game`]: play moves with [`Game::try_move`] or
//! [`Game::try_san`], walk the record with [`Game::rollback`],
//! [`Game::rollup`] and [`Game::goto_move`], and watch mutations through
//! [`GameObserver`]. [`pgn`] reads and writes annotated games and whole
//! archives.
//!
//! ```
//! use chessbook::{Game, pgn};
//!
//! let mut game = Game::new();
//! game.try_san("e4").unwrap();
//! game.try_san("e5").unwrap();
//! game.rollback().unwrap();
//! game.try_san("c5").unwrap(); // recorded as a variation
//!
//! let text = pgn::write_game(&game);
//! assert!(text.contains("1. e4 e5 (1... c5)"));
//! ```

pub mod board;
pub mod game;
pub mod movegen;
pub mod pgn;
pub mod piece;
pub mod san;
pub mod tree;
pub mod types;

pub use board::{Board, UndoInfo};
pub use game::{Game, GameObserver, MoveOutcome, PromotionHandler, STARTING_FEN};
pub use tree::{Attached, GameTree, MoveId, MoveList, MoveNode, MoveRecord, SecondaryEffect};
pub use types::{
    CastleSide, CastlingRights, ChessError, Color, DrawReason, GameResult, GameStatus, Move,
    MoveFlags, Piece, PieceType, Square,
};
