//! SGF parser: converts SGF text into an owned node tree.
//!
//! Grammar (FF[4]):
//! ```text
//! Collection = GameTree { GameTree }
//! GameTree   = "(" Sequence { GameTree } ")"
//! Sequence   = Node { Node }
//! Node       = ";" { Property }
//! Property   = PropIdent PropValue { PropValue }
//! PropValue  = "[" text "]"
//! ```
//! A sequence becomes a first-child chain; the nested game trees hang off
//! its last node as children. Malformed input is rejected wholesale.

use crate::error::{GameError, Result};
use crate::model::{Node, Property};

/// Variations nested deeper than this are rejected rather than risking
/// stack exhaustion on hostile input.
const MAX_DEPTH: usize = 1_000;

/// Parse an SGF string and return the root node of its first game tree.
pub fn parse_sgf(text: &str) -> Result<Node> {
    let mut trees = parse_collection(text)?;
    log::debug!("parsed SGF collection with {} game tree(s)", trees.len());
    // parse_collection never returns an empty vector
    Ok(trees.swap_remove(0))
}

/// Parse every game tree in an SGF collection.
pub fn parse_collection(text: &str) -> Result<Vec<Node>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parser = Parser { text, pos: 0 };

    parser.skip_whitespace();
    if parser.at_end() {
        return Err(GameError::format(0, "empty input"));
    }

    let mut trees = Vec::new();
    while !parser.at_end() {
        if parser.peek() != Some(b'(') {
            return Err(parser.unexpected("expected '(' to start a game tree"));
        }
        trees.push(parser.game_tree(0)?);
        parser.skip_whitespace();
    }
    Ok(trees)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, context: &str) -> GameError {
        match self.text[self.pos..].chars().next() {
            Some(c) => GameError::format(self.pos, format!("unexpected '{c}': {context}")),
            None => GameError::format(self.pos, format!("unexpected end of input: {context}")),
        }
    }

    // ─── Game tree ───────────────────────────────────────────────────

    fn game_tree(&mut self, depth: usize) -> Result<Node> {
        if depth > MAX_DEPTH {
            return Err(GameError::format(self.pos, "variations nested too deeply"));
        }
        let start = self.pos;
        // caller guarantees '('
        self.pos += 1;
        self.skip_whitespace();

        let mut sequence: Vec<Vec<Property>> = Vec::new();
        while self.peek() == Some(b';') {
            self.pos += 1;
            sequence.push(self.node_properties()?);
            self.skip_whitespace();
        }

        let mut variations = Vec::new();
        loop {
            match self.peek() {
                Some(b'(') => {
                    if sequence.is_empty() {
                        return Err(GameError::format(
                            self.pos,
                            "game tree must start with a ';' node",
                        ));
                    }
                    variations.push(self.game_tree(depth + 1)?);
                    self.skip_whitespace();
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return Err(self.unexpected("expected ';', '(' or ')'")),
                None => return Err(GameError::format(start, "unterminated game tree")),
            }
        }

        let Some(last) = sequence.pop() else {
            return Err(GameError::format(start, "game tree contains no nodes"));
        };
        let mut current = Node {
            properties: last,
            children: variations,
        };
        while let Some(properties) = sequence.pop() {
            current = Node {
                properties,
                children: vec![current],
            };
        }
        Ok(current)
    }

    // ─── Node / property ─────────────────────────────────────────────

    fn node_properties(&mut self) -> Result<Vec<Property>> {
        let mut properties = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b) if b.is_ascii_alphabetic() => properties.push(self.property()?),
                _ => return Ok(properties),
            }
        }
    }

    fn property(&mut self) -> Result<Property> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let raw = &self.text[start..self.pos];
        // Old FF[3] files spell identifiers like "AddBlack"; only the
        // capitals are significant.
        let id: String = raw.chars().filter(|c| c.is_ascii_uppercase()).collect();
        if id.is_empty() {
            return Err(GameError::format(
                start,
                format!("property identifier '{raw}' has no uppercase letters"),
            ));
        }

        self.skip_whitespace();
        let mut values = Vec::new();
        while self.peek() == Some(b'[') {
            values.push(self.value()?);
            self.skip_whitespace();
        }
        if values.is_empty() {
            return Err(GameError::format(
                self.pos,
                format!("property {id} has no value"),
            ));
        }
        Ok(Property::from_raw(id, values))
    }

    /// Read one bracketed value, resolving `\` escapes. A backslash before
    /// a line break is a soft break and is dropped together with it.
    fn value(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut chunk_start = self.pos;

        loop {
            match self.peek() {
                None => return Err(GameError::format(start, "unterminated property value")),
                Some(b']') => {
                    out.push_str(&self.text[chunk_start..self.pos]);
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&self.text[chunk_start..self.pos]);
                    self.pos += 1;
                    match self.text[self.pos..].chars().next() {
                        None => {
                            return Err(GameError::format(start, "unterminated property value"))
                        }
                        Some('\n') => {
                            self.pos += 1;
                            if self.peek() == Some(b'\r') {
                                self.pos += 1;
                            }
                        }
                        Some('\r') => {
                            self.pos += 1;
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        Some(c) => {
                            out.push(c);
                            self.pos += c.len_utf8();
                        }
                    }
                    chunk_start = self.pos;
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}
