//! # Code Fragments
//!
//! A fragment is a snippet of host source with typed holes. Fragments are
//! parsed once from their template text and then transformed piece by piece,
//! so substituting `#e` can never clobber part of an unrelated identifier.
//!
//! Hole syntax:
//! - `#next`: insertion point for the next fragment
//! - `#e` / `#+e`: current / freshly bound element variable
//! - `#k` / `#+k`: current / freshly bound key variable
//! - `#arg1`, `#arg2`, ...: the call's arguments, 1-based
//! - `#T`, `#U`, `#V`, `#W`: resolved type variables
//! - any other `#word`: a named directive filled in by the caller (`#name`)

use std::fmt;

use crate::error::{GenError, Result};
use crate::types::Type;

const TYPE_VARS: [char; 4] = ['T', 'U', 'V', 'W'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hole {
    Next,
    Elem,
    NewElem,
    Key,
    NewKey,
    /// Zero-based argument index
    Arg(usize),
    TypeVar(usize),
    Directive(String),
}

impl fmt::Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Hole::Next => write!(f, "#next"),
            Hole::Elem => write!(f, "#e"),
            Hole::NewElem => write!(f, "#+e"),
            Hole::Key => write!(f, "#k"),
            Hole::NewKey => write!(f, "#+k"),
            Hole::Arg(i) => write!(f, "#arg{}", i + 1),
            Hole::TypeVar(i) => write!(f, "#{}", TYPE_VARS[*i]),
            Hole::Directive(name) => write!(f, "#{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Hole(Hole),
}

/// Element and key variable counters for one pipeline. `e1`/`k1` are bound
/// by the loop; every `#+e`/`#+k` advances to a fresh name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarCounters {
    pub elem: usize,
    pub key: usize,
}

impl VarCounters {
    pub fn new() -> Self {
        VarCounters { elem: 1, key: 1 }
    }
}

impl Default for VarCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pieces: Vec<Piece>,
}

impl Fragment {
    /// Parse template text. Surrounding whitespace is trimmed; a `#` that does
    /// not introduce a hole is kept as text.
    pub fn parse(src: &str) -> Fragment {
        let src = src.trim();
        let bytes = src.as_bytes();
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'#' {
                let next = src[i..].find('#').map_or(src.len(), |off| i + off);
                text.push_str(&src[i..next]);
                i = next;
                continue;
            }

            let (hole, consumed) = match scan_hole(&src[i + 1..]) {
                Some(found) => found,
                None => {
                    text.push('#');
                    i += 1;
                    continue;
                }
            };
            if !text.is_empty() {
                pieces.push(Piece::Text(std::mem::take(&mut text)));
            }
            pieces.push(Piece::Hole(hole));
            i += 1 + consumed;
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Fragment { pieces }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// A fragment that only forwards to the next one
    pub fn is_passthrough(&self) -> bool {
        matches!(self.pieces.as_slice(), [] | [Piece::Hole(Hole::Next)])
    }

    pub fn count(&self, hole: &Hole) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Hole(h) if h == hole))
            .count()
    }

    /// Check the insertion-point invariant: exactly `expected` `#next` holes
    pub fn check_insertion_points(
        &self,
        op: &'static str,
        section: &'static str,
        expected: usize,
    ) -> Result<()> {
        let found = self.count(&Hole::Next);
        if found != expected {
            return Err(GenError::MalformedFragment {
                op,
                section,
                reason: format!("expected {} insertion point(s), found {}", expected, found),
            });
        }
        Ok(())
    }

    /// Replace `#T`..`#W` with the printed form of the resolved types
    pub fn substitute_types(&mut self, op: &'static str, types: &[Type]) -> Result<()> {
        for piece in &mut self.pieces {
            if let Piece::Hole(Hole::TypeVar(i)) = piece {
                let i = *i;
                let ty = types.get(i).ok_or_else(|| GenError::MalformedFragment {
                    op,
                    section: "type",
                    reason: format!("type variable #{} is not resolved", TYPE_VARS[i]),
                })?;
                *piece = Piece::Text(ty.to_string());
            }
        }
        self.merge_text();
        Ok(())
    }

    /// Replace `#argN` with the identifier of argument `offset + N - 1`
    pub fn substitute_args(&mut self, prefix: &str, offset: usize) {
        for piece in &mut self.pieces {
            if let Piece::Hole(Hole::Arg(i)) = piece {
                *piece = Piece::Text(format!("{}{}", prefix, offset + *i));
            }
        }
        self.merge_text();
    }

    /// Replace named directives; unknown names are left in place
    pub fn fill(&mut self, name: &str, value: &str) {
        for piece in &mut self.pieces {
            if matches!(piece, Piece::Hole(Hole::Directive(d)) if d == name) {
                *piece = Piece::Text(value.to_string());
            }
        }
        self.merge_text();
    }

    /// Insert `inner` at the first insertion point. A passthrough inner
    /// fragment leaves `self` unchanged.
    pub fn splice(&self, inner: &Fragment) -> Fragment {
        if inner.is_passthrough() {
            return self.clone();
        }
        let mut pieces = Vec::with_capacity(self.pieces.len() + inner.pieces.len());
        let mut inserted = false;
        for piece in &self.pieces {
            if !inserted && *piece == Piece::Hole(Hole::Next) {
                pieces.extend(inner.pieces.iter().cloned());
                inserted = true;
            } else {
                pieces.push(piece.clone());
            }
        }
        let mut spliced = Fragment { pieces };
        spliced.merge_text();
        spliced
    }

    /// Bind element and key holes to concrete variable names. Every `#e` takes
    /// the current element name; if the fragment binds a new element (`#+e`)
    /// the counter advances and `#+e` takes the fresh name. Keys likewise.
    pub fn bind_vars(&mut self, counters: &mut VarCounters) {
        let elem = counters.elem;
        let key = counters.key;
        let new_elem = self.count(&Hole::NewElem) > 0;
        let new_key = self.count(&Hole::NewKey) > 0;
        if new_elem {
            counters.elem += 1;
        }
        if new_key {
            counters.key += 1;
        }

        for piece in &mut self.pieces {
            let name = match piece {
                Piece::Hole(Hole::Elem) => format!("e{}", elem),
                Piece::Hole(Hole::NewElem) => format!("e{}", counters.elem),
                Piece::Hole(Hole::Key) => format!("k{}", key),
                Piece::Hole(Hole::NewKey) => format!("k{}", counters.key),
                _ => continue,
            };
            *piece = Piece::Text(name);
        }
        self.merge_text();
    }

    fn merge_text(&mut self) {
        let mut merged: Vec<Piece> = Vec::with_capacity(self.pieces.len());
        for piece in self.pieces.drain(..) {
            match (merged.last_mut(), piece) {
                (Some(Piece::Text(prev)), Piece::Text(next)) => prev.push_str(&next),
                (_, piece) => merged.push(piece),
            }
        }
        self.pieces = merged;
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => write!(f, "{}", text)?,
                Piece::Hole(hole) => write!(f, "{}", hole)?,
            }
        }
        Ok(())
    }
}

/// Recognize the hole following a `#`, returning it with the number of bytes
/// consumed after the `#`
fn scan_hole(rest: &str) -> Option<(Hole, usize)> {
    if let Some(after_plus) = rest.strip_prefix('+') {
        let word = word_at(after_plus);
        return match word {
            "e" => Some((Hole::NewElem, 2)),
            "k" => Some((Hole::NewKey, 2)),
            _ => None,
        };
    }

    let word = word_at(rest);
    let hole = match word {
        "" => return None,
        "next" => Hole::Next,
        "e" => Hole::Elem,
        "k" => Hole::Key,
        "T" => Hole::TypeVar(0),
        "U" => Hole::TypeVar(1),
        "V" => Hole::TypeVar(2),
        "W" => Hole::TypeVar(3),
        _ => match word.strip_prefix("arg").and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => Hole::Arg(n - 1),
            _ => Hole::Directive(word.to_string()),
        },
    };
    Some((hole, word.len()))
}

fn word_at(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .unwrap_or(s.len());
    &s[..end]
}

/// Re-indent assembled code with tabs according to brace depth
pub fn reindent(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut depth: usize = 0;
    for line in code.lines() {
        let line = line.trim();
        let closes_first = line.starts_with('}');
        if closes_first {
            depth = depth.saturating_sub(1);
        }
        if !line.is_empty() {
            for _ in 0..depth {
                out.push('\t');
            }
            out.push_str(line);
        }
        out.push('\n');

        let opens = line.matches('{').count();
        let closes = line.matches('}').count() - usize::from(closes_first);
        depth = (depth + opens).saturating_sub(closes);
    }
    out
}
