//! The built-in function suite the loader exposes to pattern programs, and
//! the output sink the display builtins write through.
//!
//! The operations here are ordinary tree transformations; only `show` and
//! `note` have side effects, and those go through a caller-supplied
//! [`OutputSink`] so embedders decide where display output lands.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{
    Block, Env, ExpandingRepeat, FixedBlockRepeat, FixedRepeat, Node, NativeFunction, Pattern,
    Row, RowRepeat, walk,
};
use crate::diagnostics::SkeinError;
use crate::engine::prepare_pattern;
use crate::export::export_text;
use crate::infer::{count_rows, infer_counts};
use crate::subst::substitute;
use crate::verify::verify_pattern;

// ============================================================================
// OUTPUT
// ============================================================================

/// Where display builtins write their output.
pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

/// A sink that discards everything, for running without output.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) {}
}

/// A sink that captures output in memory, for tests and embedders.
#[derive(Default)]
pub struct BufferSink {
    buffer: String,
}

impl BufferSink {
    pub fn contents(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for BufferSink {
    fn emit(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// A shared handle to an output sink.
pub type SharedOutput = Rc<RefCell<dyn OutputSink>>;

// ============================================================================
// BUILTIN OPERATIONS
// ============================================================================

/// Reflects the tree horizontally: stitch order reverses, stitch kinds and
/// sides stay as they are. This is a geometric mirror, not a yarn-direction
/// reversal.
pub fn reflect(node: &Node) -> Node {
    fn reflect_sequence(stitches: &[Node]) -> Vec<Node> {
        stitches.iter().rev().map(reflect).collect()
    }
    match node {
        Node::Row(row) => {
            Node::Row(Row { stitches: reflect_sequence(&row.stitches), ..row.clone() })
        }
        Node::FixedRepeat(rep) => Node::FixedRepeat(FixedRepeat {
            stitches: reflect_sequence(&rep.stitches),
            ..rep.clone()
        }),
        Node::ExpandingRepeat(rep) => Node::ExpandingRepeat(ExpandingRepeat {
            stitches: reflect_sequence(&rep.stitches),
            ..rep.clone()
        }),
        _ => {
            let mapped: Result<Node, std::convert::Infallible> =
                walk::map_children(node, &mut |child| Ok(reflect(child)));
            match mapped {
                Ok(reflected) => reflected,
                Err(never) => match never {},
            }
        }
    }
}

/// Repeats a pattern horizontally and vertically to fill a `width` by
/// `height` box. The box must divide evenly into copies of the pattern.
pub fn fill(pattern: &Node, width: u32, height: u32) -> Result<Node, SkeinError> {
    let counted = infer_counts(pattern, None)?;
    let Node::Pattern(p) = &counted else {
        return Err(SkeinError::type_error("fill expects a pattern", pattern.span()));
    };
    let mut widest = 0;
    for row in &p.rows {
        let consumes = row.consumes().ok_or_else(|| {
            SkeinError::type_error("cannot fill a pattern of unknown width", p.span)
        })?;
        widest = widest.max(consumes);
    }
    let pattern_rows = count_rows(&counted)?;
    if widest <= 0 || pattern_rows == 0 {
        return Err(SkeinError::type_error("cannot fill with an empty pattern", p.span));
    }
    let box_width = i64::from(width);
    let box_height = u64::from(height);
    if box_width % widest != 0
        || box_width < widest
        || box_height % pattern_rows != 0
        || box_height < pattern_rows
    {
        return Err(SkeinError::non_even_fill(widest, pattern_rows, width, height, p.span));
    }
    let across = (box_width / widest) as u32;
    let down = (box_height / pattern_rows) as u32;

    let scaled = p.counts.map(|c| c.scale(across));
    let block = Block { patterns: vec![counted.clone()], counts: p.counts, span: None };
    let tiled_across = FixedBlockRepeat {
        block: Box::new(Node::Block(block)),
        times: Box::new(Node::natural(across)),
        counts: scaled,
        span: None,
    };
    let tiled_down = RowRepeat {
        rows: vec![Node::FixedBlockRepeat(tiled_across)],
        times: Box::new(Node::natural(down)),
        counts: scaled,
        span: None,
    };
    Ok(Node::Pattern(Pattern {
        rows: vec![Node::RowRepeat(tiled_down)],
        counts: scaled,
        ..p.clone()
    }))
}

/// The widest row of the pattern, in consumed stitches, as a natural.
pub fn pattern_width(pattern: &Node) -> Result<Node, SkeinError> {
    let Node::Pattern(p) = pattern else {
        return Err(SkeinError::type_error("width expects a pattern", pattern.span()));
    };
    let substituted = substitute(pattern, &p.env.clone().unwrap_or_default())?;
    let counted = infer_counts(&substituted, None)?;
    let Node::Pattern(counted) = &counted else {
        return Err(SkeinError::internal("substitution changed the pattern's kind"));
    };
    let widest = counted.rows.iter().filter_map(Node::consumes).max().unwrap_or(0);
    let widest = u32::try_from(widest)
        .map_err(|_| SkeinError::internal("pattern width exceeds the representable range"))?;
    Ok(Node::natural(widest))
}

/// The number of physical rows of the pattern, as a natural.
pub fn pattern_height(pattern: &Node) -> Result<Node, SkeinError> {
    let Node::Pattern(p) = pattern else {
        return Err(SkeinError::type_error("height expects a pattern", pattern.span()));
    };
    let substituted = substitute(pattern, &p.env.clone().unwrap_or_default())?;
    let rows = count_rows(&substituted)?;
    let rows = u32::try_from(rows)
        .map_err(|_| SkeinError::internal("pattern height exceeds the representable range"))?;
    Ok(Node::natural(rows))
}

// ============================================================================
// THE DEFAULT ENVIRONMENT
// ============================================================================

/// The name-to-node environment of built-in functions, writing display
/// output through `output`. The loader extends this with user definitions.
pub fn default_env(output: SharedOutput) -> Env {
    let mut env = Env::new();
    env.insert(
        "reflect".to_string(),
        native("reflect", |args| {
            expect_arity(args, 1)?;
            Ok(Some(reflect(&args[0])))
        }),
    );
    env.insert(
        "fill".to_string(),
        native("fill", |args| {
            expect_arity(args, 3)?;
            let width = expect_natural(&args[1], "fill width")?;
            let height = expect_natural(&args[2], "fill height")?;
            fill(&args[0], width, height).map(Some)
        }),
    );
    env.insert(
        "width".to_string(),
        native("width", |args| {
            expect_arity(args, 1)?;
            pattern_width(&args[0]).map(Some)
        }),
    );
    env.insert(
        "height".to_string(),
        native("height", |args| {
            expect_arity(args, 1)?;
            pattern_height(&args[0]).map(Some)
        }),
    );
    let out = Rc::clone(&output);
    env.insert(
        "show".to_string(),
        native("show", move |args| show(&out, args)),
    );
    let out = Rc::clone(&output);
    env.insert(
        "note".to_string(),
        native("note", move |args| {
            expect_arity(args, 1)?;
            out.borrow_mut().emit(&format!("{}\n", args[0].pretty()));
            Ok(None)
        }),
    );
    env
}

/// Prepares, exports, and verifies a pattern, writing the instructions and
/// any diagnostics to the sink. Takes an optional description argument.
fn show(out: &SharedOutput, args: &[Node]) -> Result<Option<Node>, SkeinError> {
    if args.is_empty() || args.len() > 2 {
        return Err(SkeinError::arity(1, args.len(), None));
    }
    let prepared = prepare_pattern(&args[0])?;
    let text = export_text(&prepared)?;
    if let Some(description) = args.get(1) {
        out.borrow_mut().emit(&format!("\n\x1b[1m{}\x1b[0m\n\n", description.pretty()));
    }
    out.borrow_mut().emit(&format!("{text}\n\n"));
    for diagnostic in verify_pattern(&prepared) {
        out.borrow_mut().emit(&format!("error: {diagnostic}\n"));
    }
    Ok(None)
}

fn native(
    name: &'static str,
    func: impl Fn(&[Node]) -> Result<Option<Node>, SkeinError> + 'static,
) -> Node {
    Node::Native(NativeFunction::new(name, Rc::new(func)))
}

fn expect_arity(args: &[Node], expected: usize) -> Result<(), SkeinError> {
    if args.len() != expected {
        return Err(SkeinError::arity(expected, args.len(), None));
    }
    Ok(())
}

fn expect_natural(node: &Node, what: &str) -> Result<u32, SkeinError> {
    crate::ast::natural_value(node).ok_or_else(|| {
        SkeinError::type_error(
            format!("{what} must be a natural number, found {}", node.kind_name()),
            node.span(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitch::Stitch;

    fn k() -> Node {
        Node::stitch(Stitch::Knit)
    }

    fn two_by_two() -> Node {
        // A 2-stitch, 2-row stockinette swatch fragment.
        Node::Pattern(Pattern::new(vec![
            Node::Row(Row::new(vec![Node::FixedRepeat(FixedRepeat::new(
                vec![Node::stitch(Stitch::CastOn)],
                2,
            ))])),
            Node::Row(Row::new(vec![Node::FixedRepeat(FixedRepeat::new(
                vec![Node::stitch(Stitch::BindOff)],
                2,
            ))])),
        ]))
    }

    #[test]
    fn reflect_mirrors_stitch_order_only() {
        let row = Node::Row(Row::new(vec![k(), Node::stitch(Stitch::Purl)]));
        let mirrored = reflect(&row);
        let Node::Row(mirrored) = mirrored else { panic!("expected a row") };
        assert_eq!(mirrored.stitches, vec![Node::stitch(Stitch::Purl), k()]);
    }

    #[test]
    fn fill_rejects_uneven_boxes() {
        let err = fill(&two_by_two(), 5, 2).unwrap_err();
        assert!(matches!(err, SkeinError::NonEvenFill { .. }));
    }

    #[test]
    fn fill_tiles_evenly_divisible_boxes() {
        let filled = fill(&two_by_two(), 4, 4).unwrap();
        let Node::Pattern(pattern) = &filled else { panic!("expected a pattern") };
        let Node::RowRepeat(down) = &pattern.rows[0] else { panic!("expected a row repeat") };
        assert_eq!(down.times_value().unwrap(), 2);
        let Node::FixedBlockRepeat(across) = &down.rows[0] else {
            panic!("expected a block repeat")
        };
        assert_eq!(across.times_value().unwrap(), 2);
    }

    #[test]
    fn width_and_height_report_pattern_dimensions() {
        let pattern = two_by_two();
        assert_eq!(pattern_width(&pattern).unwrap(), Node::natural(2));
        assert_eq!(pattern_height(&pattern).unwrap(), Node::natural(2));
    }

    #[test]
    fn note_writes_through_the_sink() {
        let sink = Rc::new(RefCell::new(BufferSink::default()));
        let env = default_env(sink.clone());
        let Some(Node::Native(note)) = env.get("note") else { panic!("note is registered") };
        note.invoke(&[Node::natural(7)]).unwrap();
        assert_eq!(sink.borrow().contents(), "7\n");
    }
}
