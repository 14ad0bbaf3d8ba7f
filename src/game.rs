//! Game controller: one chess game from start to finish.
//!
//! `Game` ties the pieces together: the live `Board`, the branching
//! `GameTree` record, the PGN tag pairs, the result, and the registered
//! observers. Moves go through a two-phase commit: the move is applied to
//! the board and a full `MoveRecord` is built, then every observer gets a
//! pre-commit look and may veto; only an unanimously approved move is
//! attached to the tree.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::board::{self, Board, UndoInfo};
use crate::movegen;
use crate::san;
use crate::tree::{GameTree, MoveId, MoveList, MoveRecord, SecondaryEffect};
use crate::types::{
    ChessError, Color, DrawReason, GameResult, GameStatus, Move, PieceType,
};

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Callbacks fired around game mutations. All calls are synchronous, in
/// registration order.
///
/// `on_move` runs after the move has been applied and recorded but before it
/// is committed to the tree; returning `false` vetoes the move and the board
/// is rolled back. The veto is a logical AND across all observers (every
/// observer is still consulted).
#[allow(unused_variables)]
pub trait GameObserver {
    fn on_move(&mut self, record: &MoveRecord) -> bool {
        true
    }
    fn after_move(&mut self, record: &MoveRecord) {}
    fn on_rollback(&mut self, record: &MoveRecord) {}
    fn on_rollup(&mut self, record: &MoveRecord) {}
    fn on_goto(&mut self, at: Option<MoveId>) {}
    /// Fired once per mutation, or once per batch inside
    /// `begin_update`/`end_update`.
    fn on_board_change(&mut self) {}
}

/// Asked to pick a promotion kind when a pawn reaches the last rank with no
/// kind forced by the move. Returning `None` leaves the game in the
/// pending-promotion state until `promote_pawn_to` or `cancel_promotion`.
pub type PromotionHandler = Box<dyn FnMut(Color, crate::types::Square) -> Option<PieceType>>;

/// What happened to an attempted move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Committed; the id of the new (or reused) tree node.
    Played(MoveId),
    /// An observer vetoed; the board is unchanged.
    Vetoed,
    /// A pawn reached the last rank; the game is waiting for
    /// `promote_pawn_to` or `cancel_promotion`.
    PromotionPending,
}

struct PendingPromotion {
    mv: Move,
    undo: UndoInfo,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub struct Game {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,

    board: Board,
    starting_fen: String,
    tree: GameTree,
    /// Position in the tree; `None` is the starting position.
    current: Option<MoveId>,
    status: GameStatus,
    result: GameResult,
    /// Ordered, name-unique PGN tag pairs.
    tags: Vec<(String, String)>,

    pending: Option<PendingPromotion>,
    observers: Vec<Box<dyn GameObserver>>,
    promotion_handler: Option<PromotionHandler>,

    update_depth: u32,
    board_dirty: bool,
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("fen", &self.board.to_fen())
            .field("status", &self.status)
            .field("result", &self.result)
            .finish()
    }
}

impl Game {
    /// A fresh game from the standard starting position.
    pub fn new() -> Self {
        Game {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            board: Board::starting(),
            starting_fen: STARTING_FEN.to_string(),
            tree: GameTree::new(),
            current: None,
            status: GameStatus::Active,
            result: GameResult::Unknown,
            tags: Vec::new(),
            pending: None,
            observers: Vec::new(),
            promotion_handler: None,
            update_depth: 0,
            board_dirty: false,
        }
    }

    /// A fresh game from an arbitrary position.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let mut game = Game::new();
        game.load_fen(fen, false)?;
        Ok(game)
    }

    /// Load a position.
    ///
    /// A fresh load (`restoring = false`) starts a new game: the move tree,
    /// current position, pending promotion and result are all reset and the
    /// FEN becomes the new starting position. A restoring load only replaces
    /// the board, leaving the game record alone; navigation uses this to
    /// jump between recorded positions.
    pub fn load_fen(&mut self, fen: &str, restoring: bool) -> Result<(), ChessError> {
        let board = Board::from_fen(fen)?;
        self.board = board;
        if !restoring {
            self.tree = GameTree::new();
            self.current = None;
            self.result = GameResult::Unknown;
            self.pending = None;
            self.starting_fen = self.board.to_fen();
        }
        self.refresh_status();
        self.notify_board_change();
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.to_fen()
    }

    pub fn starting_fen(&self) -> &str {
        &self.starting_fen
    }

    pub fn status(&self) -> &GameStatus {
        &self.status
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn set_result(&mut self, result: GameResult) {
        self.result = result;
    }

    pub fn tree(&self) -> &GameTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut GameTree {
        &mut self.tree
    }

    /// Id of the move the board currently sits after; `None` at the start.
    pub fn current_id(&self) -> Option<MoveId> {
        self.current
    }

    /// Record of the move at the current position.
    pub fn current_record(&self) -> Option<&MoveRecord> {
        self.current.and_then(|id| self.tree.find(id)).map(|n| &n.record)
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.board)
    }

    pub fn is_promotion_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Would `mv` be accepted right now? False in terminal or
    /// pending-promotion states, and for anything the rules reject.
    pub fn is_move_possible(&self, mv: Move) -> bool {
        !self.status.is_game_over()
            && self.pending.is_none()
            && movegen::is_move_possible(&self.board, mv)
    }

    // -- tags ---------------------------------------------------------------

    /// Set a tag pair. Replaces the value in place if the name exists,
    /// otherwise appends, so tag order is stable.
    pub fn set_tag(&mut self, name: &str, value: &str) {
        match self.tags.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.tags.push((name.to_string(), value.to_string())),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    // -- observers ----------------------------------------------------------

    pub fn add_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observers.push(observer);
    }

    pub fn set_promotion_handler(&mut self, handler: PromotionHandler) {
        self.promotion_handler = Some(handler);
    }

    /// Suppress board-change notifications until the matching `end_update`.
    /// Nests; only the outermost `end_update` emits the (single) pending
    /// notification.
    pub fn begin_update(&mut self) {
        self.update_depth += 1;
    }

    pub fn end_update(&mut self) {
        if self.update_depth > 0 {
            self.update_depth -= 1;
            if self.update_depth == 0 && self.board_dirty {
                self.board_dirty = false;
                self.notify_board_change();
            }
        }
    }

    // -- moves --------------------------------------------------------------

    /// Attempt a move. Flags are inferred from the position, so callers may
    /// pass a bare from/to pair.
    pub fn try_move(&mut self, mv: Move) -> Result<MoveOutcome, ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        if self.status.is_game_over() {
            return Err(ChessError::GameOver(self.status.to_string()));
        }

        let mv = movegen::normalize(&self.board, mv);
        if !movegen::is_move_possible(&self.board, mv) {
            return Err(ChessError::InvalidMove {
                from: mv.from.to_string(),
                to: mv.to.to_string(),
                reason: "not a legal move in this position".to_string(),
            });
        }
        let mover = self
            .board
            .piece_at(mv.from)
            .ok_or_else(|| ChessError::InvalidSquare(mv.from.to_string()))?;

        let promoting =
            mover.kind == PieceType::Pawn && mv.to.rank() == mover.color.promotion_rank();

        if let Some(kind) = mv.promotion {
            if !promoting {
                return Err(ChessError::InvalidPromotion(
                    "move is not a promotion".to_string(),
                ));
            }
            if !PieceType::PROMOTIONS.contains(&kind) {
                return Err(ChessError::InvalidPromotion(kind.to_string()));
            }
            return self.commit(mv);
        }

        if promoting {
            // No kind forced; ask the handler, otherwise park the move.
            if let Some(handler) = &mut self.promotion_handler
                && let Some(kind) = handler(mover.color, mv.to)
            {
                if !PieceType::PROMOTIONS.contains(&kind) {
                    return Err(ChessError::InvalidPromotion(kind.to_string()));
                }
                let mv = Move::with_promotion(mv.from, mv.to, kind, mv.flags);
                return self.commit(mv);
            }
            let undo = self.board.make_move(mv);
            self.pending = Some(PendingPromotion { mv, undo });
            self.notify_board_change();
            return Ok(MoveOutcome::PromotionPending);
        }

        self.commit(mv)
    }

    /// Attempt a move given in SAN.
    pub fn try_san(&mut self, token: &str) -> Result<MoveOutcome, ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        if self.status.is_game_over() {
            return Err(ChessError::GameOver(self.status.to_string()));
        }
        let mv = san::parse_san(&self.board, token)?;
        self.try_move(mv)
    }

    /// Resolve a pending promotion with the chosen kind.
    pub fn promote_pawn_to(&mut self, kind: PieceType) -> Result<MoveOutcome, ChessError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| ChessError::InvalidOperation("no promotion pending".to_string()))?;
        if !PieceType::PROMOTIONS.contains(&kind) {
            self.pending = Some(pending);
            return Err(ChessError::InvalidPromotion(kind.to_string()));
        }
        // Rewind the provisional pawn move and replay it with the kind
        // attached, going through the normal commit path.
        self.board.undo_move(pending.mv, &pending.undo);
        let mv = Move::with_promotion(pending.mv.from, pending.mv.to, kind, pending.mv.flags);
        self.commit(mv)
    }

    /// Abandon a pending promotion, restoring the position before the pawn
    /// move.
    pub fn cancel_promotion(&mut self) -> Result<(), ChessError> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| ChessError::InvalidOperation("no promotion pending".to_string()))?;
        self.board.undo_move(pending.mv, &pending.undo);
        self.notify_board_change();
        Ok(())
    }

    /// Declare a draw. The engine never declares the clock-based draws on
    /// its own; callers watch `halfmove_clock` and claim.
    pub fn declare_draw(&mut self, reason: DrawReason) -> Result<(), ChessError> {
        if self.status.is_game_over() {
            return Err(ChessError::GameOver(self.status.to_string()));
        }
        self.status = GameStatus::Draw(reason);
        self.result = GameResult::Draw;
        self.notify_board_change();
        Ok(())
    }

    /// The shared commit path: apply, record, offer to observers, attach.
    fn commit(&mut self, mv: Move) -> Result<MoveOutcome, ChessError> {
        let mover = self
            .board
            .piece_at(mv.from)
            .ok_or_else(|| ChessError::InvalidSquare(mv.from.to_string()))?;
        let color = self.board.side_to_move;
        let number = self.board.fullmove_number;

        // SAN needs the pre-move position for disambiguation.
        let san = san::move_to_san(&self.board, mv);
        let verbose = verbose_notation(mover.kind, mv);

        let undo = self.board.make_move(mv);

        let opponent = self.board.side_to_move;
        let in_check = self.board.is_in_check(opponent);
        let any_replies = movegen::has_legal_moves(&self.board);
        let checkmate = in_check && !any_replies;
        let stalemate = !in_check && !any_replies;

        let secondary = secondary_effect(mv, &undo);

        let record = MoveRecord {
            id: MoveId(0), // placeholder until attached
            piece: mover.kind,
            from: mv.from,
            to: mv.to,
            color,
            number,
            mv,
            promotion: mv.promotion,
            secondary,
            fen_after: self.board.to_fen(),
            check: in_check,
            checkmate,
            stalemate,
            drawn: stalemate,
            san,
            verbose,
            comment: None,
            nag: 0,
            result: match (checkmate, stalemate) {
                (true, _) => Some(match color {
                    Color::White => GameResult::White,
                    Color::Black => GameResult::Black,
                }),
                (_, true) => Some(GameResult::Draw),
                _ => None,
            },
        };

        if !self.approve(&record) {
            self.board.undo_move(mv, &undo);
            debug!(mv = %mv, "move vetoed by observer");
            return Ok(MoveOutcome::Vetoed);
        }

        let attached = self.tree.attach(self.current, record)?;
        self.current = Some(attached.id());

        self.status = if checkmate {
            GameStatus::Checkmate
        } else if stalemate {
            GameStatus::Stalemate
        } else if in_check {
            GameStatus::Check
        } else {
            GameStatus::Active
        };
        if checkmate {
            self.result = match color {
                Color::White => GameResult::White,
                Color::Black => GameResult::Black,
            };
        } else if stalemate {
            self.result = GameResult::Draw;
        }

        if let Some(node) = self.tree.find(attached.id()) {
            let record = node.record.clone();
            self.each_observer(|obs| obs.after_move(&record));
        }
        self.notify_board_change();
        Ok(MoveOutcome::Played(attached.id()))
    }

    fn approve(&mut self, record: &MoveRecord) -> bool {
        let mut observers = std::mem::take(&mut self.observers);
        let mut approved = true;
        for obs in &mut observers {
            approved &= obs.on_move(record);
        }
        self.observers = observers;
        approved
    }

    // -- navigation ---------------------------------------------------------

    /// Step back one move (toward the start). Returns the new current id.
    pub fn rollback(&mut self) -> Result<Option<MoveId>, ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        let current = self.current.ok_or(ChessError::NothingToUndo)?;
        let parent = self.tree.parent(current)?;
        let undone = self
            .tree
            .find(current)
            .ok_or(ChessError::UnknownMoveId(current.0))?
            .record
            .clone();

        self.load_position_at(parent)?;
        self.current = parent;
        self.each_observer(|obs| obs.on_rollback(&undone));
        self.notify_board_change();
        Ok(parent)
    }

    /// Step forward into reply `variant` of the current position (0 is the
    /// main continuation). Returns the id stepped into.
    pub fn rollup(&mut self, variant: usize) -> Result<MoveId, ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        let replies = self
            .tree
            .replies_mut(self.current)
            .ok_or(ChessError::UnknownMoveId(self.current.map_or(0, |i| i.0)))?;
        if variant >= replies.moves.len() {
            return Err(ChessError::InvalidOperation(format!(
                "no variation {variant} to step into"
            )));
        }
        // The chosen continuation becomes the main one, so stepping back and
        // forward again retraces it.
        if variant > 0 {
            let node = replies.moves.remove(variant);
            replies.moves.insert(0, node);
        }
        let record = replies.moves[0].record.clone();
        let id = record.id;

        self.board = Board::from_fen(&record.fen_after)?;
        self.current = Some(id);
        self.refresh_status();
        self.each_observer(|obs| obs.on_rollup(&record));
        self.notify_board_change();
        Ok(id)
    }

    /// Jump straight to the position after a recorded move. O(1) thanks to
    /// the stored FEN.
    pub fn goto_move(&mut self, id: MoveId) -> Result<(), ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        let fen = self
            .tree
            .find(id)
            .ok_or(ChessError::UnknownMoveId(id.0))?
            .record
            .fen_after
            .clone();
        self.board = Board::from_fen(&fen)?;
        self.current = Some(id);
        self.refresh_status();
        self.each_observer(|obs| obs.on_goto(Some(id)));
        self.notify_board_change();
        Ok(())
    }

    /// Jump to the starting position.
    pub fn goto_start(&mut self) -> Result<(), ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        let fen = self.starting_fen.clone();
        self.board = Board::from_fen(&fen)?;
        self.current = None;
        self.refresh_status();
        self.each_observer(|obs| obs.on_goto(None));
        self.notify_board_change();
        Ok(())
    }

    /// Jump to the position after Black's move `n` (or as far down the main
    /// line as it goes within move `n`). `0` is the starting position.
    pub fn goto_move_number(&mut self, n: u16) -> Result<(), ChessError> {
        if n == 0 {
            return self.goto_start();
        }
        let mut target = None;
        let mut list = &self.tree.root;
        while let Some(node) = list.main() {
            if node.record.number > n {
                break;
            }
            target = Some(node.record.id);
            list = &node.next;
        }
        match target {
            Some(id) => self.goto_move(id),
            None => Err(ChessError::InvalidOperation(format!(
                "no move number {n} on the main line"
            ))),
        }
    }

    /// Delete a move and its whole subtree. If the current position lies
    /// inside the deleted subtree, the game first steps out to the deleted
    /// move's parent.
    pub fn remove_move(&mut self, id: MoveId) -> Result<(), ChessError> {
        if self.pending.is_some() {
            return Err(ChessError::PromotionPending);
        }
        let inside = match self.current {
            Some(cur) => cur == id || self.tree.path_to(cur)?.contains(&id),
            None => false,
        };
        if inside {
            let parent = self.tree.parent(id)?;
            self.load_position_at(parent)?;
            self.current = parent;
            self.tree.remove(id)?;
            self.notify_board_change();
        } else {
            self.tree.remove(id)?;
        }
        Ok(())
    }

    /// Splice a foreign line in as a continuation of the current position.
    /// Ids are re-allocated into this tree's id space.
    pub fn add_line(&mut self, line: MoveList) -> Result<MoveId, ChessError> {
        self.tree.splice(self.current, line)
    }

    /// Annotate the move at the current position.
    pub fn set_comment(&mut self, comment: Option<String>) -> Result<(), ChessError> {
        let id = self
            .current
            .ok_or_else(|| ChessError::InvalidOperation("no move to annotate".to_string()))?;
        self.tree.set_comment(id, comment)
    }

    pub fn set_nag(&mut self, nag: u8) -> Result<(), ChessError> {
        let id = self
            .current
            .ok_or_else(|| ChessError::InvalidOperation("no move to annotate".to_string()))?;
        self.tree.set_nag(id, nag)
    }

    // -- internals ----------------------------------------------------------

    fn load_position_at(&mut self, at: Option<MoveId>) -> Result<(), ChessError> {
        let fen = match at {
            None => self.starting_fen.clone(),
            Some(id) => self
                .tree
                .find(id)
                .ok_or(ChessError::UnknownMoveId(id.0))?
                .record
                .fen_after
                .clone(),
        };
        self.board = Board::from_fen(&fen)?;
        self.refresh_status();
        Ok(())
    }

    /// Derive the status from the board alone.
    fn refresh_status(&mut self) {
        let in_check = self.board.is_in_check(self.board.side_to_move);
        let any_moves = movegen::has_legal_moves(&self.board);
        self.status = match (in_check, any_moves) {
            (true, false) => GameStatus::Checkmate,
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check,
            (false, true) => GameStatus::Active,
        };
    }

    fn each_observer(&mut self, mut f: impl FnMut(&mut Box<dyn GameObserver>)) {
        let mut observers = std::mem::take(&mut self.observers);
        for obs in &mut observers {
            f(obs);
        }
        self.observers = observers;
    }

    fn notify_board_change(&mut self) {
        if self.update_depth > 0 {
            self.board_dirty = true;
            return;
        }
        self.each_observer(|obs| obs.on_board_change());
    }
}

/// Long-algebraic rendering, e.g. "Ng1-f3", "e4xd5", "e7-e8=Q".
fn verbose_notation(piece: PieceType, mv: Move) -> String {
    let mut s = String::with_capacity(8);
    if piece != PieceType::Pawn {
        s.push(piece.to_char(Color::White));
    }
    s.push_str(&mv.from.to_algebraic());
    s.push(if mv.flags.is_capture() { 'x' } else { '-' });
    s.push_str(&mv.to.to_algebraic());
    if let Some(kind) = mv.promotion {
        s.push('=');
        s.push(kind.to_char(Color::White));
    }
    s
}

/// Derive the recorded side effect of a move. A capture wins over the
/// promotion marker since the promoted kind is recorded separately.
fn secondary_effect(mv: Move, undo: &UndoInfo) -> Option<SecondaryEffect> {
    if let Some((kind, square)) = undo.captured {
        return Some(SecondaryEffect::Capture { kind, square });
    }
    if mv.flags.is_castling() {
        let (from, to) = board::castling_rook_squares(mv.to);
        return Some(SecondaryEffect::CastleRook { from, to });
    }
    mv.promotion.map(|kind| SecondaryEffect::Promotion { kind })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
