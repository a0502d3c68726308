//! Arena of the parenthesised spans of an expression, aka a tape.
//!
//! The expression is scanned once. Every `(`…`)` pair becomes a node that
//! knows its depth and its interior, where nested pairs appear as references
//! to their own nodes instead of text. The reducer then walks the nodes
//! deepest first, left to right within a depth, which visits them in the
//! same order as repeatedly collapsing the innermost pair of the text.

use std::cmp::Reverse;
use std::ops::Range;

use crate::error::ParseError;

pub(crate) type TapeIndex = u32;

/// A part of a span's interior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Piece {
    /// Byte range into the source text.
    Text(Range<usize>),
    /// A nested span, already reduced by the time its parent is visited.
    Span(TapeIndex),
}

#[derive(Clone, Debug)]
pub(crate) struct TapeNode {
    depth: u32,
    pieces: Vec<Piece>,
}

#[derive(Clone, Debug)]
pub(crate) struct Tape {
    source: String,
    nodes: Vec<TapeNode>,
    /// Evaluation order.
    order: Vec<TapeIndex>,
    /// Position of each node in `order`, which is also its temporary number.
    rank: Vec<usize>,
}

impl Tape {
    pub fn new(source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let mut nodes: Vec<TapeNode> = vec![];
        let mut stack: Vec<TapeIndex> = vec![];

        for (i, c) in source.char_indices() {
            match c {
                '(' => {
                    let idx = nodes.len() as TapeIndex;
                    if let Some(&parent) = stack.last() {
                        nodes[parent as usize].pieces.push(Piece::Span(idx));
                    }
                    nodes.push(TapeNode {
                        depth: stack.len() as u32 + 1,
                        pieces: vec![],
                    });
                    stack.push(idx);
                }
                ')' => {
                    if stack.pop().is_none() {
                        return Err(ParseError::TooManyClose);
                    }
                }
                _ => {
                    // Text outside of any pair never takes part in the reduction.
                    let Some(&top) = stack.last() else {
                        continue;
                    };
                    let end = i + c.len_utf8();
                    let pieces = &mut nodes[top as usize].pieces;
                    if let Some(Piece::Text(range)) = pieces.last_mut() {
                        if range.end == i {
                            range.end = end;
                            continue;
                        }
                    }
                    pieces.push(Piece::Text(i..end));
                }
            }
        }

        if !stack.is_empty() {
            return Err(ParseError::TooManyOpen);
        }
        if nodes.is_empty() {
            return Err(ParseError::NoParentheses);
        }

        let mut order: Vec<TapeIndex> = (0..nodes.len() as TapeIndex).collect();
        // Stable, so nodes of equal depth stay in order of their opening parenthesis.
        order.sort_by_key(|&idx| Reverse(nodes[idx as usize].depth));
        let mut rank = vec![0; nodes.len()];
        for (pos, &idx) in order.iter().enumerate() {
            rank[idx as usize] = pos;
        }

        Ok(Self {
            source,
            nodes,
            order,
            rank,
        })
    }

    pub fn order(&self) -> &[TapeIndex] {
        &self.order
    }

    pub fn pieces(&self, idx: TapeIndex) -> &[Piece] {
        &self.nodes[idx as usize].pieces
    }

    pub fn rank(&self, idx: TapeIndex) -> usize {
        self.rank[idx as usize]
    }

    pub fn text(&self, range: &Range<usize>) -> &str {
        &self.source[range.clone()]
    }

    /// Name under which a reduced span is known, e.g. `x3`.
    pub fn temporary_name(&self, idx: TapeIndex) -> String {
        format!("x{}", self.rank(idx))
    }

    /// Writes pieces back as text, with nested spans shown by their temporary names.
    pub fn render(&self, pieces: &[Piece]) -> String {
        pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(range) => self.text(range).to_string(),
                Piece::Span(idx) => self.temporary_name(*idx),
            })
            .collect()
    }

    pub fn rendered_len(&self, pieces: &[Piece]) -> usize {
        pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(range) => range.len(),
                Piece::Span(idx) => self.temporary_name(*idx).len(),
            })
            .sum()
    }

    /// Splits the pieces at the first character matching `pred`, searching
    /// text pieces left to right. Returns the pieces before and after it
    /// together with the matched character.
    pub fn split_first(
        &self,
        pieces: &[Piece],
        pred: impl Fn(char) -> bool,
    ) -> Option<(Vec<Piece>, char, Vec<Piece>)> {
        for (n, piece) in pieces.iter().enumerate() {
            let Piece::Text(range) = piece else {
                continue;
            };
            let Some((offset, c)) = self.text(range).char_indices().find(|&(_, c)| pred(c))
            else {
                continue;
            };
            let at = range.start + offset;
            let mut lhs = pieces[..n].to_vec();
            if range.start < at {
                lhs.push(Piece::Text(range.start..at));
            }
            let mut rhs = vec![];
            let after = at + c.len_utf8();
            if after < range.end {
                rhs.push(Piece::Text(after..range.end));
            }
            rhs.extend_from_slice(&pieces[n + 1..]);
            return Some((lhs, c, rhs));
        }
        None
    }
}
