//! The content gate.
//!
//! Served text (scripts, stylesheets) may carry marker blocks:
//!
//! ```text
//! /*ACL>2*/ ...only for level 3 and up... /*ENDACL*/
//! /*ACL<1*/ ...only for anonymous (level 0)... /*ENDACL*/
//! ```
//!
//! The operator is `>` or `<`, the threshold a single ASCII digit. A block is
//! kept (markers removed, body emitted) when `level <op> threshold` holds and
//! dropped entirely otherwise. Blocks do not nest: the first `/*ENDACL*/`
//! after an opener closes it, and any opener inside a body is plain body
//! text.
//!
//! The gate is total. An opener with a bad operator or digit, or one with no
//! terminator anywhere after it, is left in the output verbatim.

use crate::types::Level;

const OPEN: &str = "/*ACL";
const OPEN_END: &str = "*/";
const CLOSE: &str = "/*ENDACL*/";

/// Comparison operator of a marker block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOp {
    /// `>`: keep when the level is strictly greater than the threshold.
    Greater,
    /// `<`: keep when the level is strictly less than the threshold.
    Less,
}

impl GateOp {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'>' => Some(GateOp::Greater),
            b'<' => Some(GateOp::Less),
            _ => None,
        }
    }

    /// Whether a requester at `level` sees a block with this op and threshold.
    pub fn admits(&self, level: Level, threshold: u8) -> bool {
        let threshold = i64::from(threshold);
        match self {
            GateOp::Greater => level.value() > threshold,
            GateOp::Less => level.value() < threshold,
        }
    }
}

/// A piece of scanned source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any marker block, passed through unchanged.
    Text(&'a str),
    /// A complete marker block.
    Block {
        op: GateOp,
        threshold: u8,
        body: &'a str,
    },
}

/// Iterator over the segments of a source text.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

/// Split `src` into text and marker-block segments, left to right.
pub fn scan(src: &str) -> Scanner<'_> {
    Scanner { src, pos: 0 }
}

enum Opener {
    /// Well-formed opener: op, threshold, offset where the body starts.
    Valid(GateOp, u8, usize),
    Malformed,
}

/// Parse `/*ACL<op><digit>*/` at `start`.
fn parse_opener(src: &str, start: usize) -> Opener {
    let bytes = src.as_bytes();
    let at = start + OPEN.len();
    let (Some(&op), Some(&digit)) = (bytes.get(at), bytes.get(at + 1)) else {
        return Opener::Malformed;
    };
    let Some(op) = GateOp::from_byte(op) else {
        return Opener::Malformed;
    };
    if !digit.is_ascii_digit() || !src[at + 2..].starts_with(OPEN_END) {
        return Opener::Malformed;
    }
    Opener::Valid(op, digit - b'0', at + 2 + OPEN_END.len())
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        let src = self.src;
        if self.pos >= src.len() {
            return None;
        }

        let text_start = self.pos;
        let mut search = self.pos;
        loop {
            let Some(offset) = src[search..].find(OPEN) else {
                self.pos = src.len();
                return Some(Segment::Text(&src[text_start..]));
            };
            let start = search + offset;

            match parse_opener(src, start) {
                Opener::Malformed => {
                    // Markers are ASCII, so start + 1 is a char boundary.
                    search = start + 1;
                }
                Opener::Valid(op, threshold, body_start) => {
                    let Some(body_len) = src[body_start..].find(CLOSE) else {
                        // No terminator anywhere after: nothing further can close.
                        self.pos = src.len();
                        return Some(Segment::Text(&src[text_start..]));
                    };
                    if start > text_start {
                        self.pos = start;
                        return Some(Segment::Text(&src[text_start..start]));
                    }
                    let body_end = body_start + body_len;
                    self.pos = body_end + CLOSE.len();
                    return Some(Segment::Block {
                        op,
                        threshold,
                        body: &src[body_start..body_end],
                    });
                }
            }
        }
    }
}

/// Apply the content gate to `src` for a requester at `level`.
pub fn gate(src: &str, level: Level) -> String {
    let mut out = String::with_capacity(src.len());
    for segment in scan(src) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Block {
                op,
                threshold,
                body,
            } => {
                if op.admits(level, threshold) {
                    out.push_str(body);
                }
            }
        }
    }
    out
}
