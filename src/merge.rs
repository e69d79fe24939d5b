//! The horizontal composer: combining patterns placed side by side into one
//! pattern whose rows are row-for-row horizontal unions of the inputs.
//!
//! Sibling patterns repeat at different periods, so their row sequences are
//! aligned by repeating each up to the least common multiple of their
//! per-iteration row counts (never beyond a sibling's stated repeat count),
//! and the composed pattern gets an outer repeat large enough that the
//! least-frequently-repeating sibling is not truncated.
//!
//! Within one physical row, the first sibling's side is the reference: rows
//! on the other side are reversed before concatenation, and on the right
//! side the siblings are read right to left, because the knitting direction
//! inverts. Any expanding repeat must additionally reserve the stitches
//! contributed by siblings placed after it in the final order.

use crate::ast::{walk, Counts, ExpandingRepeat, Node, Pattern, Row, RowRepeat, Side};
use crate::diagnostics::SkeinError;
use crate::flatten::{flatten, repeat_rows};
use crate::infer::count_rows;
use crate::reverse::reverse;

/// Combines sibling patterns side by side into a single pattern.
pub fn merge_across(siblings: &[Node]) -> Result<Node, SkeinError> {
    if siblings.is_empty() {
        return Err(SkeinError::internal("cannot merge an empty block"));
    }
    merge_nodes(siblings)
}

fn merge_nodes(nodes: &[Node]) -> Result<Node, SkeinError> {
    if nodes.iter().all(|n| matches!(n, Node::Row(_))) {
        let rows: Vec<&Row> = nodes
            .iter()
            .map(|n| match n {
                Node::Row(row) => row,
                _ => unreachable!(),
            })
            .collect();
        return merge_rows(&rows).map(Node::Row);
    }
    if nodes
        .iter()
        .all(|n| matches!(n, Node::Row(_) | Node::RowRepeat(_) | Node::Pattern(_)))
    {
        let views: Vec<RowRepeat> = nodes.iter().map(row_repeat_view).collect();
        let merged = merge_row_repeats(&views)?;
        // The first sibling decides how the result is packaged, as calls
        // have already been substituted away the merged pattern needs no
        // parameters or environment.
        return Ok(match &nodes[0] {
            Node::Pattern(_) => Node::Pattern(Pattern {
                rows: merged.rows,
                params: Vec::new(),
                env: None,
                counts: merged.counts,
                span: None,
            }),
            _ => Node::RowRepeat(merged),
        });
    }
    Err(SkeinError::internal(format!(
        "cannot place a {} beside a {}",
        nodes[0].kind_name(),
        nodes.iter().map(Node::kind_name).find(|k| *k != nodes[0].kind_name()).unwrap_or("node")
    )))
}

/// Any row-level node seen as a row repeat.
fn row_repeat_view(node: &Node) -> RowRepeat {
    match node {
        Node::RowRepeat(rep) => rep.clone(),
        Node::Pattern(pattern) => pattern.as_row_repeat(),
        other => RowRepeat {
            rows: vec![other.clone()],
            times: Box::new(Node::natural(1)),
            counts: other.counts(),
            span: other.span(),
        },
    }
}

fn merge_row_repeats(reps: &[RowRepeat]) -> Result<RowRepeat, SkeinError> {
    if aligned_shapes_disagree(reps) {
        // Composing rows of different structural shape is undefined; unroll
        // everything first.
        let mut unrolled = Vec::with_capacity(reps.len());
        for rep in reps {
            match flatten(&Node::RowRepeat(rep.clone()), true)? {
                Node::RowRepeat(flat) => unrolled.push(flat.rows),
                other => {
                    return Err(SkeinError::internal(format!(
                        "unrolling a row repeat produced a {}",
                        other.kind_name()
                    )))
                }
            }
        }
        let rows = merge_positionwise(&unrolled)?;
        let counts = sequence_counts(&rows);
        return Ok(RowRepeat {
            rows,
            times: Box::new(Node::natural(1)),
            counts,
            span: None,
        });
    }

    // Align periods: repeat each sibling up to the LCM of the per-iteration
    // row counts, but never beyond its own stated repeat count.
    let mut unit_rows = Vec::with_capacity(reps.len());
    for rep in reps {
        let mut unit = 0;
        for row in &rep.rows {
            unit += count_rows(row)?;
        }
        unit_rows.push(unit);
    }
    let aligned_len =
        unit_rows.iter().filter(|&&n| n > 0).fold(1, |acc, &n| lcm(acc, n));

    let mut expanded = Vec::with_capacity(reps.len());
    for (rep, &unit) in reps.iter().zip(&unit_rows) {
        if unit == 0 {
            expanded.push(Vec::new());
            continue;
        }
        let times = u64::from(rep.times_value()?).min(aligned_len / unit) as u32;
        expanded.push(repeat_rows(&rep.rows, times)?);
    }
    let rows = merge_positionwise(&expanded)?;

    // The outer repeat must cover the sibling with the most total rows.
    let mut most_rows = 0;
    for rep in reps {
        most_rows = most_rows.max(count_rows(&Node::RowRepeat(rep.clone()))?);
    }
    let times = most_rows.div_ceil(aligned_len);
    let counts = sequence_counts(&rows);
    Ok(RowRepeat {
        rows,
        times: Box::new(Node::natural(u32::try_from(times).map_err(|_| {
            SkeinError::internal("merged repeat count exceeds the representable range")
        })?)),
        counts,
        span: None,
    })
}

/// Whether any aligned position holds nodes of different kinds across the
/// siblings (missing positions count as plain rows).
fn aligned_shapes_disagree(reps: &[RowRepeat]) -> bool {
    let longest = reps.iter().map(|r| r.rows.len()).max().unwrap_or(0);
    (0..longest).any(|i| {
        let mut kinds = reps
            .iter()
            .map(|rep| rep.rows.get(i).map_or("row", Node::kind_name));
        match kinds.next() {
            Some(first) => kinds.any(|kind| kind != first),
            None => false,
        }
    })
}

/// Merges the i-th entries of every sequence, padding short sequences with
/// empty right-side rows.
fn merge_positionwise(sequences: &[Vec<Node>]) -> Result<Vec<Node>, SkeinError> {
    let longest = sequences.iter().map(Vec::len).max().unwrap_or(0);
    (0..longest)
        .map(|i| {
            let aligned: Vec<Node> = sequences
                .iter()
                .map(|seq| seq.get(i).cloned().unwrap_or_else(empty_row))
                .collect();
            merge_nodes(&aligned)
        })
        .collect()
}

fn empty_row() -> Node {
    Node::Row(Row {
        stitches: Vec::new(),
        side: Some(Side::Right),
        inferred: false,
        counts: Some(Counts::ZERO),
        span: None,
    })
}

fn merge_rows(rows: &[&Row]) -> Result<Row, SkeinError> {
    // The combined row keeps the first row's side; rows on the other side
    // are reversed before concatenation. Right-side rows are read right to
    // left.
    let side = rows.first().and_then(|row| row.side);
    let in_order: Vec<&Row> = if side == Some(Side::Right) {
        rows.iter().rev().copied().collect()
    } else {
        rows.to_vec()
    };
    let mut ordered = Vec::with_capacity(in_order.len());
    for row in in_order {
        if row.side == side {
            ordered.push(row.clone());
        } else {
            match reverse(&Node::Row(row.clone()), 0)? {
                Node::Row(reversed) => ordered.push(reversed),
                other => {
                    return Err(SkeinError::internal(format!(
                        "reversing a row produced a {}",
                        other.kind_name()
                    )))
                }
            }
        }
    }

    // Each expanding repeat's tail reserve must cover the stitches of every
    // sibling placed after it in the final order.
    let consumed: Vec<i64> = ordered
        .iter()
        .map(|row| {
            row.counts.map(|c| c.consumes).ok_or_else(|| {
                SkeinError::internal("horizontal merge requires counted rows")
            })
        })
        .collect::<Result<_, _>>()?;
    for i in 0..ordered.len() {
        let after: i64 = consumed[i + 1..].iter().sum();
        if after > 0 {
            match widen_tail_reserves(&Node::Row(ordered[i].clone()), after)? {
                Node::Row(widened) => ordered[i] = widened,
                other => {
                    return Err(SkeinError::internal(format!(
                        "widening a row produced a {}",
                        other.kind_name()
                    )))
                }
            }
        }
    }

    let mut total = Counts::ZERO;
    for row in &ordered {
        // Counts were demanded above.
        total = total + row.counts.unwrap_or(Counts::ZERO);
    }
    let inferred = ordered.first().map_or(false, |row| row.inferred);
    let stitches = ordered.into_iter().flat_map(|row| row.stitches).collect();
    Ok(Row { stitches, side, inferred, counts: Some(total), span: None })
}

/// Adds `extra` to the tail reserve of every expanding repeat in `node`.
fn widen_tail_reserves(node: &Node, extra: i64) -> Result<Node, SkeinError> {
    match node {
        Node::ExpandingRepeat(rep) => {
            let stitches: Vec<Node> = rep
                .stitches
                .iter()
                .map(|stitch| widen_tail_reserves(stitch, extra))
                .collect::<Result<_, _>>()?;
            let to_last = i64::from(rep.to_last_value()?) + extra;
            let to_last = u32::try_from(to_last).map_err(|_| {
                SkeinError::internal("tail reserve exceeds the representable range")
            })?;
            Ok(Node::ExpandingRepeat(ExpandingRepeat {
                stitches,
                to_last: Box::new(Node::natural(to_last)),
                ..rep.clone()
            }))
        }
        _ => walk::map_children(node, &mut |child| widen_tail_reserves(child, extra)),
    }
}

/// A row sequence consumes what its first row consumes and produces what
/// its last row produces.
fn sequence_counts(rows: &[Node]) -> Option<Counts> {
    let consumes = rows.first()?.consumes()?;
    let produces = rows.last()?.produces()?;
    Some(Counts { consumes, produces })
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}
