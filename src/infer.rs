//! Side and count inference: two independent top-down passes over the
//! post-substitution tree.
//!
//! Side inference fills in the fabric side of every row that lacks one,
//! alternating per row-level child. A pattern derives its own starting side
//! from the cast-on rule: a pattern whose first row is composed entirely of
//! cast-ons starts on the wrong side, because casting on is itself the
//! wrong-side setup row.
//!
//! Count inference fills in `consumes`/`produces` annotations bottom-up,
//! threading the number of available stitches sequentially through rows.
//! Inference is best-effort: where the budget is unknown, counts stay
//! unknown rather than failing. The one hard failure is an expanding repeat
//! with no known budget, which nothing downstream could make sense of. The
//! verifier, not this pass, enforces that divisions come out exact.

use crate::ast::{
    walk, Block, Counts, ExpandingRepeat, FixedBlockRepeat, FixedRepeat, Node, Pattern, Row,
    RowRepeat, Side,
};
use crate::diagnostics::SkeinError;
use crate::stitch::Stitch;

// ============================================================================
// SIDE INFERENCE
// ============================================================================

/// Assigns a side to every row lacking one, starting from `side`.
///
/// Rows whose side was written by the author are left alone; rows whose side
/// was filled in by an earlier run of this pass may be overwritten. Block
/// siblings are parallel, not sequential: each one starts from the same
/// side. A pattern ignores `side` entirely and derives its own start from
/// the cast-on rule.
pub fn infer_sides(node: &Node, side: Side) -> Node {
    match node {
        Node::Pattern(pattern) => {
            let start =
                if starts_with_cast_ons(node) { Side::Wrong } else { Side::Right };
            let rows = pattern
                .rows
                .iter()
                .zip(start.alternate())
                .map(|(row, side)| infer_sides(row, side))
                .collect();
            Node::Pattern(Pattern { rows, ..pattern.clone() })
        }
        Node::Block(block) => {
            let patterns =
                block.patterns.iter().map(|sibling| infer_sides(sibling, side)).collect();
            Node::Block(Block { patterns, ..block.clone() })
        }
        Node::FixedBlockRepeat(rep) => Node::FixedBlockRepeat(FixedBlockRepeat {
            block: Box::new(infer_sides(&rep.block, side)),
            ..rep.clone()
        }),
        Node::RowRepeat(rep) => {
            let rows = rep
                .rows
                .iter()
                .zip(side.alternate())
                .map(|(row, side)| infer_sides(row, side))
                .collect();
            Node::RowRepeat(RowRepeat { rows, ..rep.clone() })
        }
        Node::Row(row) => {
            if row.side.is_none() || row.inferred {
                Node::Row(Row { side: Some(side), inferred: true, ..row.clone() })
            } else {
                node.clone()
            }
        }
        _ => node.clone(),
    }
}

/// Whether the first row of `node` is composed entirely of cast-on stitches.
pub fn starts_with_cast_ons(node: &Node) -> bool {
    cast_ons_acc(node, true)
}

fn cast_ons_acc(node: &Node, acc: bool) -> bool {
    match node {
        Node::Pattern(pattern) => {
            pattern.rows.first().map_or(false, |row| cast_ons_acc(row, acc))
        }
        Node::RowRepeat(rep) => rep.rows.first().map_or(false, |row| cast_ons_acc(row, acc)),
        Node::Stitch(lit) => acc && lit.stitch == Stitch::CastOn,
        _ => walk::fold_children(node, acc, &mut |acc, child| cast_ons_acc(child, acc)),
    }
}

/// The side the first physical row of `node` is knitted on.
pub fn starting_side(node: &Node) -> Side {
    match node {
        Node::Row(row) => row.side.unwrap_or(Side::Right),
        Node::RowRepeat(rep) => rep.rows.first().map_or(Side::Right, starting_side),
        Node::Pattern(pattern) => pattern.rows.first().map_or(Side::Right, starting_side),
        _ => Side::Right,
    }
}

// ============================================================================
// ROW COUNTING
// ============================================================================

/// The number of physical rows `node` spans.
pub fn count_rows(node: &Node) -> Result<u64, SkeinError> {
    match node {
        Node::Row(_) => Ok(1),
        Node::RowRepeat(rep) => {
            let unit = sum_rows(&rep.rows)?;
            Ok(unit * u64::from(rep.times_value()?))
        }
        Node::Pattern(pattern) => sum_rows(&pattern.rows),
        Node::Block(block) => {
            let mut most = 0;
            for sibling in &block.patterns {
                most = most.max(count_rows(sibling)?);
            }
            Ok(most)
        }
        Node::FixedBlockRepeat(rep) => count_rows(&rep.block),
        _ => Ok(0),
    }
}

fn sum_rows(rows: &[Node]) -> Result<u64, SkeinError> {
    let mut total = 0;
    for row in rows {
        total += count_rows(row)?;
    }
    Ok(total)
}

// ============================================================================
// COUNT INFERENCE
// ============================================================================

/// Annotates `node` with as many stitch counts as can be determined, given
/// `available` stitches remaining in the current row (when known).
pub fn infer_counts(node: &Node, available: Option<i64>) -> Result<Node, SkeinError> {
    match node {
        Node::FixedRepeat(rep) => {
            let times = rep.times_value()?;
            let (stitches, unit) = infer_sequence(&rep.stitches, available)?;
            Ok(Node::FixedRepeat(FixedRepeat {
                stitches,
                counts: unit.map(|c| c.scale(times)),
                ..rep.clone()
            }))
        }
        Node::ExpandingRepeat(rep) => {
            let available = available.ok_or_else(|| SkeinError::ambiguous(rep.span))?;
            let budget = available - i64::from(rep.to_last_value()?);
            let (stitches, unit) = infer_sequence(&rep.stitches, Some(budget))?;
            let unit = unit.ok_or_else(|| SkeinError::ambiguous(rep.span))?;
            if unit.consumes <= 0 {
                // A repeat that consumes nothing never runs out of stitches;
                // no finite repeat count exists.
                return Err(SkeinError::ambiguous(rep.span));
            }
            let n = budget.div_euclid(unit.consumes);
            Ok(Node::ExpandingRepeat(ExpandingRepeat {
                stitches,
                counts: Some(Counts { consumes: unit.consumes * n, produces: unit.produces * n }),
                ..rep.clone()
            }))
        }
        Node::Row(row) => {
            let (stitches, counts) = infer_sequence(&row.stitches, available)?;
            Ok(Node::Row(Row { stitches, counts, ..row.clone() }))
        }
        Node::RowRepeat(rep) => {
            let times = rep.times_value()?;
            let (rows, counts) = infer_row_sequence(&rep.rows, times, available)?;
            Ok(Node::RowRepeat(RowRepeat { rows, counts, ..rep.clone() }))
        }
        Node::Pattern(pattern) => {
            let (rows, counts) = infer_row_sequence(&pattern.rows, 1, available)?;
            Ok(Node::Pattern(Pattern { rows, counts, ..pattern.clone() }))
        }
        Node::Block(block) => {
            // Siblings occupy disjoint stitches; they do not share a budget.
            // Only a lone sibling inherits the enclosing one.
            let counted: Vec<Node> = if block.patterns.len() == 1 {
                vec![infer_counts(&block.patterns[0], available)?]
            } else {
                block
                    .patterns
                    .iter()
                    .map(|sibling| infer_counts(sibling, None))
                    .collect::<Result<_, _>>()?
            };
            let mut total = Some(Counts::ZERO);
            for sibling in &counted {
                total = match (total, sibling.counts()) {
                    (Some(acc), Some(counts)) => Some(acc + counts),
                    _ => None,
                };
            }
            Ok(Node::Block(Block { patterns: counted, counts: total, ..block.clone() }))
        }
        Node::FixedBlockRepeat(rep) => {
            let times = rep.times_value()?;
            let block = infer_counts(&rep.block, available)?;
            let counts = block.counts().map(|c| c.scale(times));
            Ok(Node::FixedBlockRepeat(FixedBlockRepeat {
                block: Box::new(block),
                counts,
                ..rep.clone()
            }))
        }
        _ => Ok(node.clone()),
    }
}

/// Infers a stitch sequence, threading the budget left to right. Returns the
/// annotated children and the sequence totals, or `None` totals if any
/// child's counts stayed unknown.
fn infer_sequence(
    stitches: &[Node],
    available: Option<i64>,
) -> Result<(Vec<Node>, Option<Counts>), SkeinError> {
    let mut counted = Vec::with_capacity(stitches.len());
    let mut running = Some(Counts::ZERO);
    for stitch in stitches {
        let remaining = match (running, available) {
            (Some(acc), Some(budget)) => Some(budget - acc.consumes),
            _ => None,
        };
        let stitch = infer_counts(stitch, remaining)?;
        running = match (running, stitch.counts()) {
            (Some(acc), Some(counts)) => Some(acc + counts),
            _ => None,
        };
        counted.push(stitch);
    }
    Ok((counted, running))
}

/// Infers a row sequence, threading each row's `produces` into the next
/// row's budget. The sequence is walked `times` passes so the budget coming
/// out reflects the full repeat, but only the first pass's annotations are
/// kept.
fn infer_row_sequence(
    rows: &[Node],
    times: u32,
    available: Option<i64>,
) -> Result<(Vec<Node>, Option<Counts>), SkeinError> {
    if rows.is_empty() {
        return Ok((Vec::new(), Some(Counts::ZERO)));
    }
    let mut counted: Vec<Node> = Vec::with_capacity(rows.len());
    let mut remaining = available;
    for _ in 0..times.max(1) {
        for row in rows {
            let row = infer_counts(row, remaining)?;
            remaining = row.produces();
            if counted.len() < rows.len() {
                counted.push(row);
            }
        }
    }
    let counts = match (counted.first().and_then(Node::consumes), remaining) {
        (Some(consumes), Some(produces)) => Some(Counts { consumes, produces }),
        _ => None,
    };
    Ok((counted, counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpandingRepeat, FixedRepeat, Pattern, Row};

    fn co(n: u32) -> Node {
        Node::FixedRepeat(FixedRepeat::new(vec![Node::stitch(Stitch::CastOn)], n))
    }

    #[test]
    fn cast_on_row_starts_the_pattern_on_the_wrong_side() {
        let pattern = Node::Pattern(Pattern::new(vec![
            Node::Row(Row::new(vec![co(3)])),
            Node::Row(Row::new(vec![Node::FixedRepeat(FixedRepeat::new(
                vec![Node::stitch(Stitch::Knit)],
                3,
            ))])),
        ]));
        let sided = infer_sides(&pattern, Side::Right);
        let Node::Pattern(pattern) = sided else { panic!("expected a pattern") };
        let sides: Vec<_> = pattern
            .rows
            .iter()
            .map(|row| match row {
                Node::Row(row) => row.side,
                _ => None,
            })
            .collect();
        assert_eq!(sides, vec![Some(Side::Wrong), Some(Side::Right)]);
    }

    #[test]
    fn explicit_sides_are_not_overwritten() {
        let pattern = Node::Pattern(Pattern::new(vec![Node::Row(Row::with_side(
            vec![Node::stitch(Stitch::Knit)],
            Side::Wrong,
        ))]));
        let Node::Pattern(pattern) = infer_sides(&pattern, Side::Right) else {
            panic!("expected a pattern")
        };
        let Node::Row(row) = &pattern.rows[0] else { panic!("expected a row") };
        assert_eq!(row.side, Some(Side::Wrong));
        assert!(!row.inferred);
    }

    #[test]
    fn expanding_repeat_without_budget_is_ambiguous() {
        let rep = Node::ExpandingRepeat(ExpandingRepeat::new(
            vec![Node::stitch(Stitch::Knit)],
            0,
        ));
        let err = infer_counts(&rep, None).unwrap_err();
        assert!(matches!(err, SkeinError::AmbiguousRepeat { .. }));
    }

    #[test]
    fn expanding_repeat_resolves_against_the_budget() {
        let rep = Node::ExpandingRepeat(ExpandingRepeat::new(
            vec![Node::stitch(Stitch::Knit)],
            2,
        ));
        let counted = infer_counts(&rep, Some(10)).unwrap();
        assert_eq!(counted.counts(), Some(Counts { consumes: 8, produces: 8 }));
    }

    #[test]
    fn zero_consuming_expanding_unit_is_ambiguous() {
        let rep = Node::ExpandingRepeat(ExpandingRepeat::new(
            vec![Node::stitch(Stitch::YarnOver)],
            0,
        ));
        let err = infer_counts(&rep, Some(10)).unwrap_err();
        assert!(matches!(err, SkeinError::AmbiguousRepeat { .. }));
    }

    #[test]
    fn rows_thread_produces_into_the_next_budget() {
        let pattern = Node::Pattern(Pattern::new(vec![
            Node::Row(Row::new(vec![co(4)])),
            Node::Row(Row::new(vec![Node::ExpandingRepeat(ExpandingRepeat::new(
                vec![Node::stitch(Stitch::Knit)],
                0,
            ))])),
        ]));
        let counted = infer_counts(&pattern, Some(0)).unwrap();
        let Node::Pattern(pattern) = counted else { panic!("expected a pattern") };
        assert_eq!(pattern.rows[1].counts(), Some(Counts { consumes: 4, produces: 4 }));
    }

    #[test]
    fn pattern_totals_come_from_first_and_last_rows() {
        let pattern = Node::Pattern(Pattern::new(vec![
            Node::Row(Row::new(vec![co(2)])),
            Node::Row(Row::new(vec![Node::FixedRepeat(FixedRepeat::new(
                vec![Node::stitch(Stitch::BindOff)],
                2,
            ))])),
        ]));
        let counted = infer_counts(&pattern, Some(0)).unwrap();
        assert_eq!(counted.counts(), Some(Counts::ZERO));
    }

    #[test]
    fn count_rows_multiplies_repeats() {
        let rep = Node::RowRepeat(RowRepeat::new(
            vec![
                Node::Row(Row::new(vec![Node::stitch(Stitch::Knit)])),
                Node::Row(Row::new(vec![Node::stitch(Stitch::Purl)])),
            ],
            3,
        ));
        assert_eq!(count_rows(&rep).unwrap(), 6);
    }
}
