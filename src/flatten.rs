//! Structural normalization: collapsing redundant nesting, unrolling
//! repeats, and reducing blocks through the horizontal composer.
//!
//! Flattening is a bottom-up rewrite with one simplification per node kind.
//! `unroll` forces row repeats to be expanded into literal rows; it is
//! always forced on while descending into block siblings, so an uneven mix
//! of rows and row repeats across siblings cannot misalign the merge.

use crate::ast::{
    walk, Counts, ExpandingRepeat, FixedRepeat, Node, Pattern, Row, RowRepeat, StitchLit,
};
use crate::diagnostics::SkeinError;
use crate::infer::{count_rows, infer_sides, starting_side};
use crate::merge::merge_across;
use crate::stitch::Stitch;

/// Flattens blocks, nested patterns, and nested repeats.
pub fn flatten(node: &Node, unroll: bool) -> Result<Node, SkeinError> {
    match node {
        Node::FixedRepeat(rep) => flatten_fixed(rep, unroll),
        Node::Row(row) => {
            let fixed = flatten_fixed(&row.as_fixed(), unroll)?;
            let Node::FixedRepeat(fixed) = fixed else {
                return Err(SkeinError::internal("flattening a row produced a non-repeat"));
            };
            Ok(Node::Row(Row { stitches: fixed.stitches, ..row.clone() }))
        }
        Node::RowRepeat(rep) => {
            let rows = flatten_row_sequence(&rep.rows, unroll)?;
            Ok(Node::RowRepeat(RowRepeat { rows, ..rep.clone() }))
        }
        Node::Pattern(pattern) => {
            let rows = flatten_row_sequence(&pattern.rows, unroll)?;
            Ok(Node::Pattern(Pattern { rows, ..pattern.clone() }))
        }
        Node::Block(block) => {
            // Unrolling is forced so every sibling arrives at the composer
            // in the same structural shape.
            let siblings: Vec<Node> = block
                .patterns
                .iter()
                .map(|sibling| flatten(sibling, true))
                .collect::<Result<_, _>>()?;
            merge_across(&siblings)
        }
        Node::FixedBlockRepeat(rep) => {
            let times = rep.times_value()?;
            let flat = flatten(&rep.block, unroll)?;
            let repeated = repeat_across(&flat, times)?;
            match flatten(&repeated, unroll)? {
                Node::Pattern(pattern) => Ok(Node::Pattern(Pattern {
                    counts: pattern.counts.map(|c| c.scale(times)),
                    ..pattern
                })),
                other => Err(SkeinError::internal(format!(
                    "repeating a block produced a {}",
                    other.kind_name()
                ))),
            }
        }
        _ => walk::map_children(node, &mut |child| flatten(child, unroll)),
    }
}

fn flatten_fixed(rep: &FixedRepeat, unroll: bool) -> Result<Node, SkeinError> {
    let times = rep.times_value()?;
    // A repeat whose only child is itself a fixed repeat reads confusingly
    // when printed; multiply the counts together instead.
    if times != 1 && rep.stitches.len() == 1 {
        if let Node::FixedRepeat(inner) = &rep.stitches[0] {
            let merged = FixedRepeat {
                stitches: inner.stitches.clone(),
                times: Box::new(Node::natural(inner.times_value()? * times)),
                counts: inner.counts.map(|c| c.scale(times)),
                span: rep.span,
            };
            return flatten(&Node::FixedRepeat(merged), unroll);
        }
    }
    let mut stitches = Vec::with_capacity(rep.stitches.len());
    for stitch in &rep.stitches {
        match flatten(stitch, unroll)? {
            // Un-nest fixed repeats that only repeat once.
            Node::FixedRepeat(inner) if inner.times_value()? == 1 => {
                stitches.extend(inner.stitches)
            }
            other => stitches.push(other),
        }
    }
    Ok(Node::FixedRepeat(FixedRepeat { stitches, ..rep.clone() }))
}

fn flatten_row_sequence(rows: &[Node], unroll: bool) -> Result<Vec<Node>, SkeinError> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match flatten(row, unroll)? {
            Node::RowRepeat(inner) => {
                let times = inner.times_value()?;
                if unroll || times <= 1 {
                    out.extend(repeat_rows(&inner.rows, times)?);
                } else {
                    out.push(Node::RowRepeat(inner));
                }
            }
            Node::Pattern(inner) => out.extend(inner.rows),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Duplicates `rows` in sequence `times` times.
///
/// When the repeated span covers an odd number of physical rows, each
/// iteration starts on the opposite side from the last, so the inferred
/// sides are reassigned per iteration; rows with author-written sides keep
/// them.
pub fn repeat_rows(rows: &[Node], times: u32) -> Result<Vec<Node>, SkeinError> {
    if rows.is_empty() || times == 0 {
        return Ok(Vec::new());
    }
    let mut physical = 0;
    for row in rows {
        physical += count_rows(row)?;
    }
    let mut side = starting_side(&rows[0]);
    let mut current: Vec<Node> = rows.to_vec();
    let mut out = Vec::with_capacity(rows.len() * times as usize);
    for _ in 0..times {
        out.extend(current.iter().cloned());
        if physical % 2 != 0 {
            side = side.flip();
            current = current
                .iter()
                .zip(side.alternate())
                .map(|(row, side)| infer_sides(row, side))
                .collect();
        }
    }
    Ok(out)
}

/// Duplicates every row's content horizontally `times` times by wrapping it
/// in a fixed repeat, scaling the row counts to match.
fn repeat_across(node: &Node, times: u32) -> Result<Node, SkeinError> {
    match node {
        Node::Row(row) => {
            let widened = FixedRepeat {
                stitches: row.stitches.clone(),
                times: Box::new(Node::natural(times)),
                counts: row.counts.map(|c| c.scale(times)),
                span: row.span,
            };
            Ok(Node::Row(Row {
                stitches: vec![Node::FixedRepeat(widened)],
                counts: row.counts.map(|c| c.scale(times)),
                ..row.clone()
            }))
        }
        _ => walk::map_children(node, &mut |child| repeat_across(child, times)),
    }
}

// ============================================================================
// STITCH RUN COMBINING
// ============================================================================

/// Merges adjacent identical stitches (and single-stitch repeats of the same
/// stitch) into one counted run, so instructions read "K 3" rather than
/// "K, K, K".
pub fn combine_stitches(node: &Node) -> Result<Node, SkeinError> {
    match node {
        Node::FixedRepeat(rep) => {
            let stitches = combine_sequence(&rep.stitches)?;
            Ok(Node::FixedRepeat(FixedRepeat { stitches, ..rep.clone() }))
        }
        Node::ExpandingRepeat(rep) => {
            let stitches = combine_sequence(&rep.stitches)?;
            Ok(Node::ExpandingRepeat(ExpandingRepeat { stitches, ..rep.clone() }))
        }
        Node::Row(row) => {
            let stitches = combine_sequence(&row.stitches)?;
            Ok(Node::Row(Row { stitches, ..row.clone() }))
        }
        _ => walk::map_children(node, &mut combine_stitches),
    }
}

fn combine_sequence(stitches: &[Node]) -> Result<Vec<Node>, SkeinError> {
    let mut out: Vec<Node> = Vec::with_capacity(stitches.len());
    for stitch in stitches {
        let combined = combine_stitches(stitch)?;
        let joined = match (out.last().and_then(run_of), run_of(&combined)) {
            (Some((last, last_times)), Some((next, next_times))) if last == next => {
                Some(stitch_run(last, last_times + next_times))
            }
            _ => None,
        };
        match joined {
            Some(run) => {
                out.pop();
                out.push(run);
            }
            None => out.push(combined),
        }
    }
    Ok(out)
}

/// The stitch and multiplicity of a node that is a plain run, if it is one.
fn run_of(node: &Node) -> Option<(Stitch, u32)> {
    match node {
        Node::Stitch(lit) => Some((lit.stitch, 1)),
        Node::FixedRepeat(rep) if rep.stitches.len() == 1 => match &rep.stitches[0] {
            Node::Stitch(lit) => {
                Some((lit.stitch, crate::ast::natural_value(&rep.times)?))
            }
            _ => None,
        },
        _ => None,
    }
}

fn stitch_run(stitch: Stitch, times: u32) -> Node {
    let counts = Counts { consumes: stitch.consumes(), produces: stitch.produces() };
    Node::FixedRepeat(FixedRepeat {
        stitches: vec![Node::Stitch(StitchLit { stitch, span: None })],
        times: Box::new(Node::natural(times)),
        counts: Some(counts.scale(times)),
        span: None,
    })
}
