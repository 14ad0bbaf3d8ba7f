//! PGN import and export.
//!
//! The writer renders a `Game` (tags, movetext with nested variations,
//! comments, NAGs, result marker) with lines wrapped near 80 columns. The
//! parser is a recursive-descent scanner over the raw bytes that drives a
//! scratch `Game`: each SAN token is played through the normal move path, a
//! `(` rolls the game back one move, parses the variation recursively and
//! jumps back to where it left off. Variations therefore land in the tree
//! exactly as if a user had navigated and played them.
//!
//! Multi-game archives are split on `[Event` lines; a game that fails to
//! parse is logged and skipped so one bad game cannot sink an archive. The
//! byte offsets of the games can be stored in a small binary index (one
//! 4-byte little-endian offset per game) that is rebuildable from the
//! archive alone.

use tracing::warn;

use crate::game::{Game, MoveOutcome, STARTING_FEN};
use crate::tree::{MoveId, MoveList, MoveNode};
use crate::types::{ChessError, Color, GameResult};

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Maximum width the movetext lines aim for.
const LINE_WIDTH: usize = 80;

/// Render a complete PGN game: tag section, blank line, movetext.
pub fn write_game(game: &Game) -> String {
    let mut out = String::with_capacity(512);

    // Seven Tag Roster first, in canonical order.
    for name in SEVEN_TAG_ROSTER {
        let value = match name {
            "Result" => game.result().marker().to_string(),
            "Date" => game
                .tag("Date")
                .map(str::to_string)
                .unwrap_or_else(|| game.created_at.format("%Y.%m.%d").to_string()),
            _ => game.tag(name).unwrap_or("?").to_string(),
        };
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag(&value)));
    }

    // Remaining tags in insertion order, skipping the derived ones.
    for (name, value) in game.tags() {
        if SEVEN_TAG_ROSTER.contains(&name.as_str()) || name == "SetUp" || name == "FEN" {
            continue;
        }
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag(value)));
    }

    // Custom starting position.
    if game.starting_fen() != STARTING_FEN {
        out.push_str("[SetUp \"1\"]\n");
        out.push_str(&format!("[FEN \"{}\"]\n", game.starting_fen()));
    }

    out.push('\n');

    let mut tokens = Vec::new();
    render_continuation(&game.tree().root, &mut tokens, false);
    tokens.push(game.result().marker().to_string());

    out.push_str(&wrap_tokens(&tokens));
    out.push('\n');
    out
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Walk a line: main move, its variations, then the main continuation.
fn render_continuation(list: &MoveList, tokens: &mut Vec<String>, mut need_number: bool) {
    if let Some(comment) = &list.comment {
        tokens.push(format!("{{{comment}}}"));
        need_number = true;
    }
    let mut cursor = list;
    let mut first = true;
    while let Some(main) = cursor.moves.first() {
        let mut interrupted = emit_node(main, need_number || first, tokens);
        for variation in &cursor.moves[1..] {
            tokens.push("(".to_string());
            let inner = emit_node(variation, true, tokens);
            render_continuation(&variation.next, tokens, inner);
            tokens.push(")".to_string());
            interrupted = true;
        }
        need_number = interrupted;
        cursor = &main.next;
        first = false;
    }
}

/// Emit one move with its number, NAG and comment. Returns true if the
/// following move will need its number restated.
fn emit_node(node: &MoveNode, force_number: bool, tokens: &mut Vec<String>) -> bool {
    let record = &node.record;
    if record.color == Color::White || force_number {
        tokens.push(record.number_label());
    }
    tokens.push(record.san.clone());
    if record.nag != 0 {
        tokens.push(format!("${}", record.nag));
    }
    if let Some(comment) = &record.comment {
        tokens.push(format!("{{{comment}}}"));
        return true;
    }
    false
}

/// Join tokens into lines of at most `LINE_WIDTH` columns. Opening
/// parentheses glue to the following token and closing ones to the previous.
fn wrap_tokens(tokens: &[String]) -> String {
    let mut words: Vec<String> = Vec::with_capacity(tokens.len());
    let mut prefix = String::new();
    for token in tokens {
        if token == "(" {
            prefix.push('(');
        } else if token == ")" {
            match words.last_mut() {
                Some(last) => last.push(')'),
                None => words.push(")".to_string()),
            }
        } else {
            words.push(format!("{prefix}{token}"));
            prefix.clear();
        }
    }

    let mut out = String::new();
    let mut line_len = 0;
    for word in words {
        if line_len == 0 {
            out.push_str(&word);
            line_len = word.len();
        } else if line_len + 1 + word.len() > LINE_WIDTH {
            out.push('\n');
            out.push_str(&word);
            line_len = word.len();
        } else {
            out.push(' ');
            out.push_str(&word);
            line_len += 1 + word.len();
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor {
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    /// Skip whitespace, `;` rest-of-line comments and `%` escape lines.
    fn skip_filler(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b';') => {
                    while let Some(b) = self.bump() {
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                Some(b'%') if self.at_line_start() => {
                    while let Some(b) = self.bump() {
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.bytes.get(self.pos - 1) == Some(&b'\n')
    }

    fn error(&self, message: impl Into<String>) -> ChessError {
        ChessError::PgnSyntax {
            line: self.line,
            message: message.into(),
        }
    }
}

/// Parse a single PGN game.
pub fn parse_game(input: &str) -> Result<Game, ChessError> {
    let mut cur = Cursor::new(input);
    let mut game = Game::new();

    cur.skip_filler();
    while cur.peek() == Some(b'[') {
        parse_tag(&mut cur, &mut game)?;
        cur.skip_filler();
    }

    if let Some(fen) = game.tag("FEN").map(str::to_string) {
        game.load_fen(&fen, false)?;
    }

    parse_movetext(&mut cur, &mut game, 0)?;

    // A Result tag without a termination marker still sets the result.
    if game.result() == GameResult::Unknown
        && let Some(result) = game.tag("Result").and_then(GameResult::from_marker)
    {
        game.set_result(result);
    }

    // Leave the game at the end of the main line, the natural resume point.
    if let Some(last) = last_main_id(&game) {
        game.goto_move(last)?;
    }
    Ok(game)
}

fn last_main_id(game: &Game) -> Option<MoveId> {
    game.tree().main_line().last().map(|r| r.id)
}

/// One `[Name "Value"]` pair.
fn parse_tag(cur: &mut Cursor, game: &mut Game) -> Result<(), ChessError> {
    cur.bump(); // '['
    cur.skip_filler();

    let mut name = String::new();
    while let Some(b) = cur.peek() {
        if b.is_ascii_whitespace() || b == b'"' {
            break;
        }
        name.push(cur.bump().unwrap_or_default() as char);
    }
    if name.is_empty() {
        return Err(cur.error("empty tag name"));
    }
    cur.skip_filler();

    if cur.peek() != Some(b'"') {
        return Err(cur.error(format!("expected quoted value for tag [{name}]")));
    }
    cur.bump();
    let mut value = String::new();
    loop {
        match cur.bump() {
            None => return Err(cur.error(format!("unterminated value for tag [{name}]"))),
            Some(b'"') => break,
            Some(b'\\') => match cur.bump() {
                Some(b) => value.push(b as char),
                None => return Err(cur.error("dangling escape in tag value")),
            },
            Some(b) => value.push(b as char),
        }
    }
    cur.skip_filler();
    if cur.bump() != Some(b']') {
        return Err(cur.error(format!("expected ']' after tag [{name}]")));
    }

    game.set_tag(&name, &value);
    Ok(())
}

/// The movetext of one line. `depth` 0 is the game itself; deeper levels are
/// variations terminated by `)`.
fn parse_movetext(cur: &mut Cursor, game: &mut Game, depth: usize) -> Result<(), ChessError> {
    let anchor = game.current_id();
    let mut pending_comment: Option<String> = None;
    let mut last_move: Option<MoveId> = None;

    loop {
        cur.skip_filler();
        let Some(byte) = cur.peek() else {
            if depth > 0 {
                return Err(cur.error("unterminated variation"));
            }
            break;
        };

        match byte {
            b'{' => {
                let text = read_comment(cur)?;
                match last_move {
                    Some(id) => append_move_comment(game, id, &text)?,
                    None => {
                        pending_comment = Some(match pending_comment.take() {
                            Some(prev) => format!("{prev} {text}"),
                            None => text,
                        });
                    }
                }
            }
            b'(' => {
                cur.bump();
                let resume = game
                    .current_id()
                    .ok_or_else(|| cur.error("variation before any move"))?;
                game.rollback()
                    .map_err(|e| cur.error(format!("cannot open variation: {e}")))?;
                parse_movetext(cur, game, depth + 1)?;
                game.goto_move(resume)
                    .map_err(|e| cur.error(format!("cannot resume after variation: {e}")))?;
            }
            b')' => {
                if depth == 0 {
                    return Err(cur.error("unmatched ')'"));
                }
                cur.bump();
                break;
            }
            b'$' => {
                cur.bump();
                let n = read_number(cur)?;
                let target = last_move
                    .ok_or_else(|| cur.error("annotation glyph before any move"))?;
                game.tree_mut().set_nag(target, n.min(u8::MAX as u32) as u8)?;
            }
            b'[' => {
                // Tag pair of a following game; not ours.
                if depth > 0 {
                    return Err(cur.error("unexpected '[' inside a variation"));
                }
                break;
            }
            _ => {
                let token = read_token(cur)?;
                if token.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    // Move number; nothing to do.
                    continue;
                }
                if token == "e.p." {
                    // Decorates the preceding capture.
                    continue;
                }
                if let Some(result) = GameResult::from_marker(&token) {
                    game.set_result(result);
                    if let Some(id) = last_move {
                        game.tree_mut().set_result(id, result)?;
                    }
                    continue;
                }

                // A SAN move, possibly with a !/? suffix carrying a NAG.
                let stripped = token.trim_end_matches(['!', '?']);
                let nag = suffix_nag(&token[stripped.len()..]);

                let outcome = game
                    .try_san(stripped)
                    .map_err(|e| cur.error(format!("bad move '{token}': {e}")))?;
                let MoveOutcome::Played(id) = outcome else {
                    return Err(cur.error(format!("move '{token}' was not playable")));
                };
                last_move = Some(id);
                if let Some(comment) = pending_comment.take() {
                    game.tree_mut().set_comment(id, Some(comment))?;
                }
                if nag != 0 {
                    game.tree_mut().set_nag(id, nag)?;
                }
            }
        }
    }

    // A comment with no move after it becomes the line's preamble.
    if let Some(comment) = pending_comment
        && last_move.is_none()
    {
        game.tree_mut().set_line_comment(anchor, Some(comment))?;
    }
    Ok(())
}

/// Standard NAG values for the suffix annotations.
fn suffix_nag(suffix: &str) -> u8 {
    match suffix {
        "!" => 1,
        "?" => 2,
        "!!" => 3,
        "??" => 4,
        "!?" => 5,
        "?!" => 6,
        _ => 0,
    }
}

fn read_comment(cur: &mut Cursor) -> Result<String, ChessError> {
    cur.bump(); // '{'
    let mut text = String::new();
    loop {
        match cur.bump() {
            None => return Err(cur.error("unterminated comment")),
            Some(b'}') => break,
            Some(b) => text.push(b as char),
        }
    }
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn append_move_comment(game: &mut Game, id: MoveId, text: &str) -> Result<(), ChessError> {
    let merged = match game.tree().find(id).and_then(|n| n.record.comment.clone()) {
        Some(prev) => format!("{prev} {text}"),
        None => text.to_string(),
    };
    game.tree_mut().set_comment(id, Some(merged))
}

fn read_number(cur: &mut Cursor) -> Result<u32, ChessError> {
    let mut n: u32 = 0;
    let mut any = false;
    while let Some(b) = cur.peek() {
        if !b.is_ascii_digit() {
            break;
        }
        n = n.saturating_mul(10).saturating_add((b - b'0') as u32);
        any = true;
        cur.bump();
    }
    if !any {
        return Err(cur.error("expected a number after '$'"));
    }
    Ok(n)
}

fn read_token(cur: &mut Cursor) -> Result<String, ChessError> {
    let mut token = String::new();
    while let Some(b) = cur.peek() {
        let c = b as char;
        if c.is_ascii_alphanumeric() || "./=+#!?*-".contains(c) {
            token.push(c);
            cur.bump();
        } else {
            break;
        }
    }
    if token.is_empty() {
        let b = cur.peek().unwrap_or(b'?');
        return Err(cur.error(format!("unexpected character '{}'", b as char)));
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

/// Split a multi-game archive into (byte offset, game text) chunks. Games
/// start at lines beginning with `[Event`.
pub fn split_archive(input: &str) -> Vec<(usize, &str)> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        if line.starts_with("[Event") {
            starts.push(offset);
        }
        offset += line.len();
    }

    if starts.is_empty() {
        if input.trim().is_empty() {
            return Vec::new();
        }
        return vec![(0, input)];
    }

    let mut chunks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(input.len());
        chunks.push((start, &input[start..end]));
    }
    chunks
}

/// Parse every game in an archive. Games that fail to parse are skipped
/// with a warning so the rest of the archive still loads.
pub fn parse_archive(input: &str) -> Vec<Game> {
    let mut games = Vec::new();
    for (offset, chunk) in split_archive(input) {
        match parse_game(chunk) {
            Ok(game) => games.push(game),
            Err(err) => {
                warn!(offset, %err, "skipping unparseable game in archive");
            }
        }
    }
    games
}

/// Byte offsets of the games in an archive, suitable for `write_index`.
pub fn game_offsets(input: &str) -> Vec<u32> {
    split_archive(input)
        .into_iter()
        .map(|(offset, _)| offset as u32)
        .collect()
}

/// Encode game offsets as the binary index format: one 4-byte little-endian
/// offset per game, in file order.
pub fn write_index(offsets: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(offsets.len() * 4);
    for &offset in offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out
}

/// Decode a binary game-offset index.
pub fn read_index(bytes: &[u8]) -> Result<Vec<u32>, ChessError> {
    if bytes.len() % 4 != 0 {
        return Err(ChessError::InvalidOperation(format!(
            "index length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameStatus;

    fn movetext_of(pgn: &str) -> String {
        pgn.split("\n\n").nth(1).unwrap_or("").trim().to_string()
    }

    #[test]
    fn write_new_game_has_roster_and_star() {
        let game = Game::new();
        let pgn = write_game(&game);
        assert!(pgn.starts_with("[Event \"?\"]"));
        assert!(pgn.contains("[Result \"*\"]"));
        assert_eq!(movetext_of(&pgn), "*");
    }

    #[test]
    fn write_short_game() {
        let mut game = Game::new();
        for san in ["e4", "e5", "Nf3"] {
            game.try_san(san).unwrap();
        }
        let pgn = write_game(&game);
        assert_eq!(movetext_of(&pgn), "1. e4 e5 2. Nf3 *");
    }

    #[test]
    fn parse_simple_game() {
        let pgn = "[Event \"Test\"]\n[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n";
        let game = parse_game(pgn).unwrap();
        assert_eq!(game.tag("Event"), Some("Test"));
        assert_eq!(game.result(), GameResult::White);
        let line = game.tree().main_line();
        assert_eq!(line.len(), 4);
        assert_eq!(line[3].san, "Nc6");
        assert_eq!(game.current_record().unwrap().san, "Nc6");
    }

    #[test]
    fn round_trip_with_variation() {
        let pgn = "\
[Event \"?\"]
[Site \"?\"]
[Date \"2024.01.01\"]
[Round \"?\"]
[White \"?\"]
[Black \"?\"]
[Result \"*\"]

1. e4 e5 (1... c5 2. Nf3 d6) 2. Nf3 Nc6 *
";
        let game = parse_game(pgn).unwrap();
        let rewritten = write_game(&game);
        assert_eq!(movetext_of(&rewritten), "1. e4 e5 (1... c5 2. Nf3 d6) 2. Nf3 Nc6 *");
        assert_eq!(parse_game(&rewritten).unwrap().tree().main_line().len(), 4);
    }

    #[test]
    fn nested_variations() {
        let pgn = "[Event \"?\"]\n\n1. e4 e5 (1... c5 2. Nf3 (2. Nc3 Nc6) d6) 2. Nf3 *";
        let game = parse_game(pgn).unwrap();

        // Root: e4 only.
        assert_eq!(game.tree().root.moves.len(), 1);
        let e4 = &game.tree().root.moves[0];
        // Replies to e4: e5 main, c5 variation.
        assert_eq!(e4.next.moves.len(), 2);
        assert_eq!(e4.next.moves[0].record.san, "e5");
        assert_eq!(e4.next.moves[1].record.san, "c5");
        // Replies to c5: Nf3 main, Nc3 variation.
        let c5 = &e4.next.moves[1];
        assert_eq!(c5.next.moves.len(), 2);
        assert_eq!(c5.next.moves[0].record.san, "Nf3");
        assert_eq!(c5.next.moves[1].record.san, "Nc3");
    }

    #[test]
    fn variation_does_not_displace_main_line() {
        let pgn = "[Event \"?\"]\n\n1. e4 e5 (1... c5) 2. Nf3 *";
        let game = parse_game(pgn).unwrap();
        let line = game.tree().main_line();
        assert_eq!(line.len(), 3);
        assert_eq!(line[1].san, "e5");
        assert_eq!(line[2].san, "Nf3");
    }

    #[test]
    fn comments_and_nags() {
        let pgn = "[Event \"?\"]\n\n1. e4 {best by test} e5 $1 2. Nf3!? *";
        let game = parse_game(pgn).unwrap();
        let line = game.tree().main_line();
        assert_eq!(line[0].comment.as_deref(), Some("best by test"));
        assert_eq!(line[1].nag, 1);
        assert_eq!(line[2].nag, 5);
        assert_eq!(line[2].san, "Nf3");

        let rewritten = write_game(&game);
        assert!(rewritten.contains("{best by test}"));
        assert!(rewritten.contains("$1"));
        assert!(rewritten.contains("$5"));
    }

    #[test]
    fn comment_before_first_move_attaches_to_it() {
        let pgn = "[Event \"?\"]\n\n{opening notes} 1. e4 *";
        let game = parse_game(pgn).unwrap();
        assert_eq!(
            game.tree().main_line()[0].comment.as_deref(),
            Some("opening notes")
        );
    }

    #[test]
    fn en_passant_marker_accepted() {
        let pgn = "[Event \"?\"]\n\n1. e4 Nf6 2. e5 d5 3. exd6 e.p. exd6 *";
        let game = parse_game(pgn).unwrap();
        let line = game.tree().main_line();
        assert_eq!(line[4].san, "exd6");
        assert!(line[4].mv.flags.is_en_passant());
    }

    #[test]
    fn custom_position_round_trip() {
        let fen = "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1";
        let mut game = Game::from_fen(fen).unwrap();
        game.try_san("e4").unwrap();
        let pgn = write_game(&game);
        assert!(pgn.contains("[SetUp \"1\"]"));
        assert!(pgn.contains(&format!("[FEN \"{fen}\"]")));

        let reparsed = parse_game(&pgn).unwrap();
        assert_eq!(reparsed.starting_fen(), fen);
        assert_eq!(reparsed.tree().main_line()[0].san, "e4");
    }

    #[test]
    fn checkmate_game_round_trip() {
        let pgn = "[Event \"?\"]\n\n1. f3 e5 2. g4 Qh4# 0-1";
        let game = parse_game(pgn).unwrap();
        assert_eq!(game.result(), GameResult::Black);
        assert_eq!(game.status(), &GameStatus::Checkmate);
        assert!(movetext_of(&write_game(&game)).ends_with("Qh4# 0-1"));
    }

    #[test]
    fn result_tag_without_marker() {
        let pgn = "[Event \"?\"]\n[Result \"1/2-1/2\"]\n\n1. e4 e5\n";
        let game = parse_game(pgn).unwrap();
        assert_eq!(game.result(), GameResult::Draw);
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let pgn = "[Event \"?\"]\n\n1. e4 e5\n2. Qxe5\n*";
        let err = parse_game(pgn).unwrap_err();
        let ChessError::PgnSyntax { line, message } = err else {
            panic!("expected a syntax error");
        };
        assert_eq!(line, 4);
        assert!(message.contains("Qxe5"));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(parse_game("[Event \"?\"]\n\n1. e4 {never closed").is_err());
    }

    #[test]
    fn unmatched_parens_are_errors() {
        assert!(parse_game("[Event \"?\"]\n\n1. e4 e5) *").is_err());
        assert!(parse_game("[Event \"?\"]\n\n1. e4 (1. d4 *").is_err());
    }

    #[test]
    fn long_games_wrap_lines() {
        let mut game = Game::new();
        for san in [
            "e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7", "Re1", "b5",
            "Bb3", "d6", "c3", "O-O", "h3", "Nb8", "d4", "Nbd7",
        ] {
            game.try_san(san).unwrap();
        }
        let pgn = write_game(&game);
        for line in movetext_of(&pgn).lines() {
            assert!(line.len() <= 80, "line too long: {line}");
        }
    }

    // -------------------------------------------------------------------
    // Archives and the offset index
    // -------------------------------------------------------------------

    const ARCHIVE: &str = "\
[Event \"First\"]

1. e4 e5 *

[Event \"Broken\"]

1. e4 e9 xx *

[Event \"Third\"]

1. d4 d5 1/2-1/2
";

    #[test]
    fn archive_splits_on_event_lines() {
        let chunks = split_archive(ARCHIVE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0, 0);
        assert!(chunks[1].1.starts_with("[Event \"Broken\"]"));
    }

    #[test]
    fn archive_skips_broken_games() {
        // Capture the skip warnings in the test output.
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::new("chessbook=warn"))
            .try_init();
        let games = parse_archive(ARCHIVE);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].tag("Event"), Some("First"));
        assert_eq!(games[1].tag("Event"), Some("Third"));
        assert_eq!(games[1].result(), GameResult::Draw);
    }

    #[test]
    fn empty_archive_has_no_games() {
        assert!(parse_archive("").is_empty());
        assert!(parse_archive("   \n\n").is_empty());
    }

    #[test]
    fn index_round_trip() {
        let offsets = game_offsets(ARCHIVE);
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0], 0);

        let encoded = write_index(&offsets);
        assert_eq!(encoded.len(), 12);
        assert_eq!(read_index(&encoded).unwrap(), offsets);
    }

    #[test]
    fn index_encoding_is_little_endian() {
        assert_eq!(write_index(&[1]), vec![1, 0, 0, 0]);
        assert_eq!(write_index(&[0x0102_0304]), vec![4, 3, 2, 1]);
    }

    #[test]
    fn truncated_index_is_an_error() {
        assert!(read_index(&[1, 2, 3]).is_err());
        assert!(read_index(&[]).unwrap().is_empty());
    }

    #[test]
    fn index_rebuilds_to_game_starts() {
        for &offset in &game_offsets(ARCHIVE) {
            assert!(ARCHIVE[offset as usize..].starts_with("[Event"));
        }
    }
}
