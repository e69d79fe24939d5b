//! Rendering a prepared pattern as human-readable knitting instructions.

use crate::ast::Node;
use crate::diagnostics::SkeinError;

/// Exports a prepared (substituted, counted, flattened) subtree as plain
/// text instructions.
pub fn export_text(node: &Node) -> Result<String, SkeinError> {
    match node {
        Node::Stitch(lit) => Ok(lit.stitch.symbol().to_string()),
        Node::FixedRepeat(rep) => {
            let stitches = export_sequence(&rep.stitches)?;
            let times = rep.times_value()?;
            if times == 1 {
                Ok(stitches)
            } else if rep.stitches.len() == 1 {
                Ok(format!("{stitches} {times}"))
            } else {
                Ok(format!("[{stitches}] {times}"))
            }
        }
        Node::ExpandingRepeat(rep) => {
            let stitches = export_sequence(&rep.stitches)?;
            let to_last = rep.to_last_value()?;
            if to_last == 0 {
                Ok(format!("*{stitches}; rep from * to end"))
            } else {
                Ok(format!("*{stitches}; rep from * to last {to_last}"))
            }
        }
        Node::Row(row) => export_sequence(&row.stitches),
        Node::RowRepeat(rep) => {
            export_rows(&rep.rows, rep.times_value()?)
        }
        Node::Pattern(pattern) => export_rows(&pattern.rows, 1),
        other => Err(SkeinError::type_error(
            format!("cannot export a {} as instructions", other.kind_name()),
            other.span(),
        )),
    }
}

fn export_sequence(stitches: &[Node]) -> Result<String, SkeinError> {
    let parts: Vec<String> = stitches.iter().map(export_text).collect::<Result<_, _>>()?;
    Ok(parts.join(", "))
}

fn export_rows(rows: &[Node], times: u32) -> Result<String, SkeinError> {
    let parts: Vec<String> = rows.iter().map(export_text).collect::<Result<_, _>>()?;
    let rows = format!("{}.", parts.join(".\n"));
    if times == 1 {
        Ok(rows)
    } else {
        Ok(format!("**\n{rows}\nrep from ** {times} times"))
    }
}
