//! Shared AST builders for the integration tests.

#![allow(dead_code)]

use skein::ast::{ExpandingRepeat, FixedRepeat, Node, Pattern, Row, RowRepeat, Side};
use skein::stitch::Stitch;

/// A single stitch leaf.
pub fn st(stitch: Stitch) -> Node {
    Node::stitch(stitch)
}

/// A run of one stitch repeated `times` times.
pub fn run(stitch: Stitch, times: u32) -> Node {
    Node::FixedRepeat(FixedRepeat::new(vec![st(stitch)], times))
}

/// An expanding repeat reserving `to_last` stitches at the end of the row.
pub fn expanding(stitches: Vec<Node>, to_last: u32) -> Node {
    Node::ExpandingRepeat(ExpandingRepeat::new(stitches, to_last))
}

pub fn row(stitches: Vec<Node>) -> Node {
    Node::Row(Row::new(stitches))
}

pub fn sided_row(stitches: Vec<Node>, side: Side) -> Node {
    Node::Row(Row::with_side(stitches, side))
}

pub fn row_repeat(rows: Vec<Node>, times: u32) -> Node {
    Node::RowRepeat(RowRepeat::new(rows, times))
}

pub fn pattern(rows: Vec<Node>) -> Node {
    Node::Pattern(Pattern::new(rows))
}

/// `CO n.` as a row.
pub fn cast_on_row(n: u32) -> Node {
    row(vec![run(Stitch::CastOn, n)])
}

/// `K n.` as a row.
pub fn knit_row(n: u32) -> Node {
    row(vec![run(Stitch::Knit, n)])
}

/// `*BO; rep from * to end.` as a row.
pub fn bind_off_row() -> Node {
    row(vec![expanding(vec![st(Stitch::BindOff)], 0)])
}
