//! The branching game record.
//!
//! A game is a tree of moves: at every position there is an ordered list of
//! sibling alternatives, where index 0 is the main continuation and the rest
//! are variations. Each node carries an immutable `MoveRecord` snapshot of
//! the move as it was played (including the resulting FEN, which makes
//! jumping to any node O(1)) plus the list of replies.
//!
//! Ids are unique across the whole tree and never reused; splicing a foreign
//! line in shifts all of its ids by one uniform offset so relative order is
//! preserved and collisions are impossible.

use crate::types::{ChessError, Color, GameResult, Move, PieceType, Square};

// ---------------------------------------------------------------------------
// MoveId
// ---------------------------------------------------------------------------

/// Tree-wide unique move identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveId(pub u32);

impl std::fmt::Display for MoveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MoveRecord
// ---------------------------------------------------------------------------

/// Side effect a move had beyond relocating the mover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecondaryEffect {
    /// A piece of the given kind was captured on the given square (which
    /// differs from the destination for en passant).
    Capture { kind: PieceType, square: Square },
    /// Castling relocated the rook.
    CastleRook { from: Square, to: Square },
    /// The pawn was replaced by the given kind.
    Promotion { kind: PieceType },
}

/// One played move, snapshotted at the moment it was committed.
///
/// Everything except the annotations (`comment`, `nag`) is immutable once
/// the record is attached to the tree.
#[derive(Clone, Debug)]
pub struct MoveRecord {
    pub id: MoveId,
    /// Kind of the piece that moved (before any promotion).
    pub piece: PieceType,
    pub from: Square,
    pub to: Square,
    pub color: Color,
    /// Fullmove number the move was played on.
    pub number: u16,
    /// The board-level move, replayable against the parent position.
    pub mv: Move,
    pub promotion: Option<PieceType>,
    pub secondary: Option<SecondaryEffect>,
    /// Position after the move; lets navigation jump here directly.
    pub fen_after: String,
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub drawn: bool,
    pub san: String,
    /// Long-algebraic form, e.g. "Ng1-f3" or "e4xd5".
    pub verbose: String,
    pub comment: Option<String>,
    /// Numeric annotation glyph; 0 means none.
    pub nag: u8,
    /// Result marker attached to this move (set by PGN termination markers).
    pub result: Option<GameResult>,
}

impl MoveRecord {
    /// The "White/Black move n" label, e.g. "3." or "3...".
    pub fn number_label(&self) -> String {
        match self.color {
            Color::White => format!("{}.", self.number),
            Color::Black => format!("{}...", self.number),
        }
    }
}

// ---------------------------------------------------------------------------
// MoveNode / MoveList
// ---------------------------------------------------------------------------

/// A move and all recorded replies to it.
#[derive(Clone, Debug)]
pub struct MoveNode {
    pub record: MoveRecord,
    pub next: MoveList,
}

/// Ordered sibling alternatives at one position. Index 0 is the main
/// continuation; the rest are variations.
#[derive(Clone, Debug, Default)]
pub struct MoveList {
    /// Comment attached before the first move of this list (a variation
    /// preamble in PGN).
    pub comment: Option<String>,
    pub moves: Vec<MoveNode>,
}

impl MoveList {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Main continuation, if any.
    pub fn main(&self) -> Option<&MoveNode> {
        self.moves.first()
    }

    fn find(&self, id: MoveId) -> Option<&MoveNode> {
        for node in &self.moves {
            if node.record.id == id {
                return Some(node);
            }
            if let Some(found) = node.next.find(id) {
                return Some(found);
            }
        }
        None
    }

    fn find_mut(&mut self, id: MoveId) -> Option<&mut MoveNode> {
        for node in &mut self.moves {
            if node.record.id == id {
                return Some(node);
            }
            if let Some(found) = node.next.find_mut(id) {
                return Some(found);
            }
        }
        None
    }

    fn remove(&mut self, id: MoveId) -> Option<MoveNode> {
        if let Some(i) = self.moves.iter().position(|n| n.record.id == id) {
            return Some(self.moves.remove(i));
        }
        for node in &mut self.moves {
            if let Some(removed) = node.next.remove(id) {
                return Some(removed);
            }
        }
        None
    }

    fn max_id(&self) -> Option<u32> {
        let mut max = None;
        for node in &self.moves {
            max = max.max(Some(node.record.id.0));
            max = max.max(node.next.max_id());
        }
        max
    }

    fn min_id(&self) -> Option<u32> {
        let mut min: Option<u32> = None;
        for node in &self.moves {
            min = Some(min.map_or(node.record.id.0, |m| m.min(node.record.id.0)));
            if let Some(child_min) = node.next.min_id() {
                min = Some(min.map_or(child_min, |m| m.min(child_min)));
            }
        }
        min
    }

    fn shift_ids(&mut self, offset: i64) {
        for node in &mut self.moves {
            node.record.id = MoveId((node.record.id.0 as i64 + offset) as u32);
            node.next.shift_ids(offset);
        }
    }

    fn collect_ids(&self, out: &mut Vec<MoveId>) {
        for node in &self.moves {
            out.push(node.record.id);
            node.next.collect_ids(out);
        }
    }
}

// ---------------------------------------------------------------------------
// GameTree
// ---------------------------------------------------------------------------

/// Outcome of attaching a move below a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attached {
    /// A new node was created with this id.
    New(MoveId),
    /// An identical sibling already existed; it was promoted to the main
    /// continuation and its id is returned.
    Existing(MoveId),
}

impl Attached {
    pub fn id(self) -> MoveId {
        match self {
            Attached::New(id) | Attached::Existing(id) => id,
        }
    }
}

/// The whole game record: root move list plus the id allocator.
#[derive(Clone, Debug, Default)]
pub struct GameTree {
    pub root: MoveList,
    next_id: u32,
}

impl GameTree {
    pub fn new() -> Self {
        GameTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up a node anywhere in the tree.
    pub fn find(&self, id: MoveId) -> Option<&MoveNode> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: MoveId) -> Option<&mut MoveNode> {
        self.root.find_mut(id)
    }

    /// The sibling list hanging off a position: the root list for the start
    /// position, otherwise the reply list of the given move.
    pub fn replies(&self, at: Option<MoveId>) -> Option<&MoveList> {
        match at {
            None => Some(&self.root),
            Some(id) => self.find(id).map(|n| &n.next),
        }
    }

    pub(crate) fn replies_mut(&mut self, at: Option<MoveId>) -> Option<&mut MoveList> {
        match at {
            None => Some(&mut self.root),
            Some(id) => self.find_mut(id).map(|n| &mut n.next),
        }
    }

    /// The move this node is a reply to; `Ok(None)` for first moves.
    pub fn parent(&self, id: MoveId) -> Result<Option<MoveId>, ChessError> {
        fn search(
            list: &MoveList,
            parent: Option<MoveId>,
            id: MoveId,
        ) -> Option<Option<MoveId>> {
            for node in &list.moves {
                if node.record.id == id {
                    return Some(parent);
                }
                if let Some(found) = search(&node.next, Some(node.record.id), id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.root, None, id).ok_or(ChessError::UnknownMoveId(id.0))
    }

    /// Ids from the first move down to `id`, inclusive.
    pub fn path_to(&self, id: MoveId) -> Result<Vec<MoveId>, ChessError> {
        let mut path = vec![id];
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor)? {
            path.push(parent);
            cursor = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Attach a move as a reply to `at` (or as a first move when `None`).
    ///
    /// If a sibling with the same board-level move already exists it is
    /// promoted to the main continuation and reused; otherwise a fresh node
    /// is appended after the existing alternatives, leaving the current main
    /// continuation in place.
    pub fn attach(
        &mut self,
        at: Option<MoveId>,
        mut record: MoveRecord,
    ) -> Result<Attached, ChessError> {
        // Reserve the id first so the mutable borrow of the list is short.
        let id = MoveId(self.next_id);
        let list = self
            .replies_mut(at)
            .ok_or(ChessError::UnknownMoveId(at.map_or(0, |i| i.0)))?;

        if let Some(i) = list.moves.iter().position(|n| n.record.mv == record.mv) {
            let existing = list.moves.remove(i);
            let existing_id = existing.record.id;
            list.moves.insert(0, existing);
            return Ok(Attached::Existing(existing_id));
        }

        self.next_id += 1;
        record.id = id;
        // Re-borrow: replies_mut cannot fail here, the position was found
        // above.
        let list = self.replies_mut(at).ok_or(ChessError::UnknownMoveId(0))?;
        list.moves.push(MoveNode {
            record,
            next: MoveList::default(),
        });
        Ok(Attached::New(id))
    }

    /// Remove a move and its entire subtree. Returns the removed node.
    pub fn remove(&mut self, id: MoveId) -> Result<MoveNode, ChessError> {
        self.root.remove(id).ok_or(ChessError::UnknownMoveId(id.0))
    }

    /// Splice a foreign line in as replies to `at`. All ids in the incoming
    /// line are shifted by one uniform offset into fresh id space; the line's
    /// first move is appended as a sibling alternative (or becomes the main
    /// continuation if there were no replies yet). Returns the id of the
    /// line's first move.
    pub fn splice(&mut self, at: Option<MoveId>, mut line: MoveList) -> Result<MoveId, ChessError> {
        let first = line
            .moves
            .first()
            .map(|n| n.record.id)
            .ok_or_else(|| ChessError::InvalidOperation("cannot splice an empty line".into()))?;

        let min = line.min_id().unwrap_or(0);
        let max = line.max_id().unwrap_or(0);
        let offset = self.next_id as i64 - min as i64;
        line.shift_ids(offset);
        self.next_id = ((max as i64 + offset) as u32) + 1;

        let first = MoveId((first.0 as i64 + offset) as u32);

        let target = self
            .replies_mut(at)
            .ok_or(ChessError::UnknownMoveId(at.map_or(0, |i| i.0)))?;
        if let Some(comment) = line.comment.take()
            && target.comment.is_none()
        {
            target.comment = Some(comment);
        }
        target.moves.extend(line.moves);
        Ok(first)
    }

    /// Records along the main line (always index 0).
    pub fn main_line(&self) -> Vec<&MoveRecord> {
        let mut out = Vec::new();
        let mut list = &self.root;
        while let Some(node) = list.main() {
            out.push(&node.record);
            list = &node.next;
        }
        out
    }

    /// Every id currently in the tree, preorder.
    pub fn all_ids(&self) -> Vec<MoveId> {
        let mut out = Vec::new();
        self.root.collect_ids(&mut out);
        out
    }

    /// Annotate a move with a comment.
    pub fn set_comment(&mut self, id: MoveId, comment: Option<String>) -> Result<(), ChessError> {
        let node = self.find_mut(id).ok_or(ChessError::UnknownMoveId(id.0))?;
        node.record.comment = comment;
        Ok(())
    }

    /// Annotate a move with a numeric annotation glyph (0 clears it).
    pub fn set_nag(&mut self, id: MoveId, nag: u8) -> Result<(), ChessError> {
        let node = self.find_mut(id).ok_or(ChessError::UnknownMoveId(id.0))?;
        node.record.nag = nag;
        Ok(())
    }

    /// Set the preamble comment of the reply list at a position (the text
    /// before the first move of a line in PGN).
    pub fn set_line_comment(
        &mut self,
        at: Option<MoveId>,
        comment: Option<String>,
    ) -> Result<(), ChessError> {
        let list = self
            .replies_mut(at)
            .ok_or(ChessError::UnknownMoveId(at.map_or(0, |i| i.0)))?;
        list.comment = comment;
        Ok(())
    }

    /// Attach a result marker to a move (the last move of a line in PGN).
    pub fn set_result(&mut self, id: MoveId, result: GameResult) -> Result<(), ChessError> {
        let node = self.find_mut(id).ok_or(ChessError::UnknownMoveId(id.0))?;
        node.record.result = Some(result);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
