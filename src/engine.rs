//! The pipeline driver: runs every pass in order to turn a raw pattern into
//! the form the exporter and verifier consume.

use crate::ast::{Node, Side};
use crate::diagnostics::SkeinError;
use crate::flatten::{combine_stitches, flatten};
use crate::infer::{infer_counts, infer_sides, starts_with_cast_ons};
use crate::reverse::alternate_sides;
use crate::subst::substitute;

/// Interprets and prepares a pattern for exporting.
///
/// Substitution runs under the pattern's own captured environment. Counts
/// are inferred twice: once so flattening and merging can read them, and
/// again because flattening synthesizes new nodes. Alternation starts from
/// the side the cast-on rule dictates.
pub fn prepare_pattern(pattern: &Node) -> Result<Node, SkeinError> {
    let Node::Pattern(p) = pattern else {
        return Err(SkeinError::type_error(
            format!("expected a pattern, found a {}", pattern.kind_name()),
            pattern.span(),
        ));
    };
    let env = p.env.clone().unwrap_or_default();
    let node = substitute(pattern, &env)?;
    let node = infer_sides(&node, Side::Right);
    let node = infer_counts(&node, None)?;
    let node = flatten(&node, false)?;
    let node = infer_counts(&node, None)?;
    let start = if starts_with_cast_ons(&node) { Side::Wrong } else { Side::Right };
    let node = alternate_sides(&node, start)?;
    let node = combine_stitches(&node)?;
    match node {
        Node::Pattern(_) => Ok(node),
        other => Err(SkeinError::internal(format!(
            "pipeline produced a {} instead of a pattern",
            other.kind_name()
        ))),
    }
}
