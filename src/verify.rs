//! The static verifier: proves a prepared pattern is knittable.
//!
//! Unlike every other pass, the verifier never aborts. It re-derives stitch
//! counts the same way inference does and collects a diagnostic for every
//! violation it finds: rows that need more stitches than are on the needle,
//! stitches left unconsumed at a row boundary, repeats whose division does
//! not come out exact, repeats that would drift in width across iterations,
//! patterns that do not start and end with an empty needle, and pass-over
//! operations with no slipped stitch available to pass.
//!
//! An empty diagnostic list means the pattern is knittable.

use std::fmt;

use crate::ast::{Node, Span};
use crate::infer::infer_counts;
use crate::stitch::Stitch;

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A node needs more stitches than the row has available.
    TooFewStitches,
    /// The pattern ends with stitches still on the needle.
    TooManyStitches,
    /// Stitches available to a row or repeat were never consumed.
    LeftoverStitches,
    /// A pass-over with no slipped stitch to pass.
    PassOverWithoutSlip,
    /// Counts could not be resolved at all, so nothing else was checkable.
    Unresolved,
}

/// One problem found in a pattern, carrying the offending node for location
/// reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub node: Node,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: impl Into<String>, node: &Node) -> Self {
        Diagnostic { kind, message: message.into(), node: node.clone() }
    }

    /// The source span of the offending node, when it has one.
    pub fn span(&self) -> Option<Span> {
        self.node.span()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.node.pretty())
    }
}

/// Checks the knittability of a pattern, returning every problem found.
pub fn verify_pattern(pattern: &Node) -> Vec<Diagnostic> {
    // Re-derive counts from an empty needle; nothing is assumed cast on
    // before the first row.
    let counted = match infer_counts(pattern, Some(0)) {
        Ok(counted) => counted,
        Err(error) => {
            return vec![Diagnostic::new(
                DiagnosticKind::Unresolved,
                error.to_string(),
                pattern,
            )]
        }
    };

    let mut diagnostics = Vec::new();
    verify_counts(&counted, 0, &mut diagnostics);
    if let Some(counts) = counted.counts() {
        if counts.consumes != 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::TooFewStitches,
                format!("expected {} stitches to be cast on", counts.consumes),
                &counted,
            ));
        }
        if counts.produces != 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::TooManyStitches,
                format!("expected {} stitches to be bound off", counts.produces),
                &counted,
            ));
        }
    }
    verify_psso(&counted, &mut diagnostics);
    diagnostics
}

// ============================================================================
// COUNT CHECKS
// ============================================================================

/// Re-checks stitch counts against `available`, reporting every mismatch.
pub fn verify_counts(node: &Node, available: i64, diagnostics: &mut Vec<Diagnostic>) {
    match node {
        Node::Stitch(lit) => {
            at_least(lit.counts().consumes, available, node, diagnostics);
        }
        Node::FixedRepeat(rep) => {
            let times = natural_or_zero(&rep.times);
            verify_stitch_sequence(&rep.stitches, times, available, node, diagnostics);
        }
        Node::Row(row) => {
            verify_stitch_sequence(&row.stitches, 1, available, node, diagnostics);
        }
        Node::ExpandingRepeat(rep) => {
            let budget = available - i64::from(natural_or_zero(&rep.to_last));
            let unit = verify_stitch_sequence(&rep.stitches, 1, budget, node, diagnostics);
            if unit > 0 {
                // The repeat runs as often as fits; anything that does not
                // divide out is left dangling before the reserved tail.
                let n = budget.div_euclid(unit);
                exactly(n * unit, budget, node, diagnostics);
            }
        }
        Node::RowRepeat(rep) => {
            let times = natural_or_zero(&rep.times);
            verify_row_sequence(&rep.rows, times, available, node, diagnostics);
        }
        Node::Pattern(pattern) => {
            verify_row_sequence(&pattern.rows, 1, available, node, diagnostics);
        }
        Node::Block(block) => {
            for sibling in &block.patterns {
                verify_counts(sibling, available, diagnostics);
            }
        }
        Node::FixedBlockRepeat(rep) => {
            verify_counts(&rep.block, available, diagnostics);
        }
        _ => {}
    }
}

/// Walks a stitch sequence, threading the budget, and checks the repeated
/// total fits. Returns the single-pass consumption.
fn verify_stitch_sequence(
    stitches: &[Node],
    times: u32,
    available: i64,
    parent: &Node,
    diagnostics: &mut Vec<Diagnostic>,
) -> i64 {
    let mut consumed = 0;
    for stitch in stitches {
        verify_counts(stitch, available - consumed, diagnostics);
        consumed += stitch.consumes().unwrap_or(0);
    }
    if times > 1 {
        at_least(i64::from(times) * consumed, available, parent, diagnostics);
    }
    consumed
}

fn verify_row_sequence(
    rows: &[Node],
    times: u32,
    available: i64,
    parent: &Node,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let start = available;
    let mut remaining = available;
    for row in rows {
        verify_counts(row, remaining, diagnostics);
        let consumes = row.consumes().unwrap_or(0);
        // Shortfalls are reported inside the row walk; only the unconsumed
        // direction is new information here.
        if consumes < remaining {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::LeftoverStitches,
                format!("{} stitches left over", remaining - consumes),
                row,
            ));
        }
        remaining = row.produces().unwrap_or(0);
    }
    if times > 1 {
        // A repeat that does not return to its starting width would drift
        // across iterations.
        exactly(start, remaining, parent, diagnostics);
    }
}

fn at_least(expected: i64, actual: i64, node: &Node, diagnostics: &mut Vec<Diagnostic>) {
    if expected > actual {
        let message = if actual > 0 {
            format!("expected {expected} stitches, but only {actual} are available")
        } else {
            format!("expected {expected} stitches, but none are available")
        };
        diagnostics.push(Diagnostic::new(DiagnosticKind::TooFewStitches, message, node));
    }
}

fn exactly(expected: i64, actual: i64, node: &Node, diagnostics: &mut Vec<Diagnostic>) {
    at_least(expected, actual, node, diagnostics);
    if expected < actual {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::LeftoverStitches,
            format!("{} stitches left over", actual - expected),
            node,
        ));
    }
}

fn natural_or_zero(node: &Node) -> u32 {
    crate::ast::natural_value(node).unwrap_or(0)
}

// ============================================================================
// PASS-OVER CHECKS
// ============================================================================

/// Verifies that every pass-over has a slipped stitch available to pass.
pub fn verify_psso(node: &Node, diagnostics: &mut Vec<Diagnostic>) {
    match node {
        Node::RowRepeat(rep) => {
            for row in &rep.rows {
                verify_psso(row, diagnostics);
            }
        }
        Node::Pattern(pattern) => {
            for row in &pattern.rows {
                verify_psso(row, diagnostics);
            }
        }
        Node::Row(_) => {
            let mut flat = Vec::new();
            unroll_stitches(node, &mut flat);
            check_psso_sequence(&flat, node, diagnostics);
        }
        _ => {}
    }
}

/// Expands every repeat into its flat sequence of concrete stitches.
fn unroll_stitches(node: &Node, out: &mut Vec<Stitch>) {
    match node {
        Node::Stitch(lit) => out.push(lit.stitch),
        Node::Row(row) => {
            for stitch in &row.stitches {
                unroll_stitches(stitch, out);
            }
        }
        Node::FixedRepeat(rep) => {
            for _ in 0..natural_or_zero(&rep.times) {
                for stitch in &rep.stitches {
                    unroll_stitches(stitch, out);
                }
            }
        }
        Node::ExpandingRepeat(rep) => {
            // The resolved repeat count is the annotated consumption divided
            // by one pass's worth.
            let unit: i64 = rep.stitches.iter().filter_map(Node::consumes).sum();
            let total = rep.counts.map_or(0, |c| c.consumes);
            let times = if unit > 0 { total.div_euclid(unit).max(0) } else { 0 };
            for _ in 0..times {
                for stitch in &rep.stitches {
                    unroll_stitches(stitch, out);
                }
            }
        }
        _ => {}
    }
}

/// Walks the flat stitch sequence keeping a prefix of live stitches; every
/// pass-over removes the nearest preceding unconsumed slip.
fn check_psso_sequence(stitches: &[Stitch], row: &Node, diagnostics: &mut Vec<Diagnostic>) {
    let mut prefix: Vec<Stitch> = Vec::with_capacity(stitches.len());
    for &stitch in stitches {
        if stitch != Stitch::PassOver {
            prefix.push(stitch);
            continue;
        }
        if prefix.last() == Some(&Stitch::Slip) {
            // Nothing sits between the slip and the pass-over, so there is
            // nothing to pass the slipped stitch over.
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::PassOverWithoutSlip,
                "PSSO without stitch to pass over",
                row,
            ));
            prefix.pop();
        } else if let Some(position) = prefix.iter().rposition(|s| *s == Stitch::Slip) {
            prefix.remove(position);
        } else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::PassOverWithoutSlip,
                "PSSO without SLIP",
                row,
            ));
        }
    }
}
