//! Yarn-direction reversal and strict side alternation.
//!
//! Reversing a row mirrors it for knitting from the other side: child order
//! flips, every stitch maps to its wrong-side equivalent, and an expanding
//! repeat's tail reserve becomes the number of stitches that used to come
//! *before* it. Reversal runs on counted trees only; it needs the consumes
//! annotations to compute each child's position.
//!
//! Alternation walks rows in document order and reverses any row that is
//! not on the side the fabric is facing, flipping the expected side after
//! every child that spans an odd number of physical rows.

use crate::ast::{walk, ExpandingRepeat, FixedRepeat, Node, Pattern, Row, RowRepeat, Side};
use crate::diagnostics::SkeinError;
use crate::infer::count_rows;

/// Reverses the yarn direction of a counted subtree.
///
/// `before` is the number of stitches consumed before this expression in the
/// current row. Each child is reversed with its own original-order prefix as
/// `before`; an expanding repeat's new tail reserve is exactly that prefix,
/// which is what makes double reversal the identity.
pub fn reverse(node: &Node, before: i64) -> Result<Node, SkeinError> {
    match node {
        Node::Stitch(lit) => match lit.stitch.reverse() {
            Some(stitch) => Ok(Node::Stitch(crate::ast::StitchLit { stitch, span: lit.span })),
            None => Err(SkeinError::irreversible(lit.stitch, lit.span)),
        },
        Node::FixedRepeat(rep) => Ok(Node::FixedRepeat(FixedRepeat {
            stitches: reverse_sequence(&rep.stitches, before)?,
            ..rep.clone()
        })),
        Node::ExpandingRepeat(rep) => {
            let stitches = reverse_sequence(&rep.stitches, before)?;
            let to_last = u32::try_from(before).map_err(|_| {
                SkeinError::internal("negative stitch prefix while reversing an expanding repeat")
            })?;
            Ok(Node::ExpandingRepeat(ExpandingRepeat {
                stitches,
                to_last: Box::new(Node::natural(to_last)),
                ..rep.clone()
            }))
        }
        Node::Row(row) => Ok(Node::Row(Row {
            stitches: reverse_sequence(&row.stitches, before)?,
            side: row.side.map(Side::flip),
            ..row.clone()
        })),
        other => Err(SkeinError::internal(format!(
            "cannot reverse a {}",
            other.kind_name()
        ))),
    }
}

fn reverse_sequence(stitches: &[Node], before: i64) -> Result<Vec<Node>, SkeinError> {
    // Each child's position is the running prefix of consumes in the
    // original order; reversal pairs the children, reversed, with their own
    // positions.
    let mut positions = Vec::with_capacity(stitches.len());
    let mut prefix = before;
    for stitch in stitches {
        positions.push(prefix);
        prefix += stitch.consumes().ok_or_else(|| {
            SkeinError::internal("reversal requires a counted tree")
        })?;
    }
    stitches
        .iter()
        .zip(positions)
        .rev()
        .map(|(stitch, position)| reverse(stitch, position))
        .collect()
}

/// Ensures every row alternates between right and wrong side, starting from
/// `side`. Rows already facing the right way pass through unchanged; the
/// rest are reversed in place.
pub fn alternate_sides(node: &Node, side: Side) -> Result<Node, SkeinError> {
    match node {
        Node::Row(row) => {
            if row.side == Some(side) {
                Ok(node.clone())
            } else {
                reverse(node, 0)
            }
        }
        Node::RowRepeat(rep) => {
            let rows = alternate_row_sequence(&rep.rows, side)?;
            Ok(Node::RowRepeat(RowRepeat { rows, ..rep.clone() }))
        }
        Node::Pattern(pattern) => {
            let rows = alternate_row_sequence(&pattern.rows, side)?;
            Ok(Node::Pattern(Pattern { rows, ..pattern.clone() }))
        }
        _ => walk::map_children(node, &mut |child| alternate_sides(child, side)),
    }
}

fn alternate_row_sequence(rows: &[Node], side: Side) -> Result<Vec<Node>, SkeinError> {
    let mut expected = side;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(alternate_sides(row, expected)?);
        // An even-length sub-repeat returns to the side it started on.
        if count_rows(row)? % 2 != 0 {
            expected = expected.flip();
        }
    }
    Ok(out)
}
