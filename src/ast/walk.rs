//! Generic single-level tree walkers.
//!
//! Every pass implements only the node kinds it cares about and falls back
//! to these for the rest. [`map_children`] rebuilds a node with a transform
//! applied to each immediate child; it does not recurse, so callers control
//! visit order by recursing inside their transform. [`fold_children`]
//! accumulates a value over the immediate children, left to right, visiting
//! the repeat-count / tail-reserve child last.

use super::{
    Block, Call, ExpandingRepeat, FixedBlockRepeat, FixedRepeat, Node, Pattern, Row, RowRepeat,
};

/// Rebuilds `node` with `f` applied to each immediate child.
///
/// Leaves (naturals, stitches, variables, natives) are returned as clones.
/// Counts, sides, parameters, and captured environments are preserved; the
/// transform sees only children.
pub fn map_children<E>(
    node: &Node,
    f: &mut impl FnMut(&Node) -> Result<Node, E>,
) -> Result<Node, E> {
    fn map_vec<E>(
        nodes: &[Node],
        f: &mut impl FnMut(&Node) -> Result<Node, E>,
    ) -> Result<Vec<Node>, E> {
        nodes.iter().map(|n| f(n)).collect()
    }

    Ok(match node {
        Node::FixedRepeat(rep) => Node::FixedRepeat(FixedRepeat {
            stitches: map_vec(&rep.stitches, f)?,
            times: Box::new(f(&rep.times)?),
            ..rep.clone()
        }),
        Node::ExpandingRepeat(rep) => Node::ExpandingRepeat(ExpandingRepeat {
            stitches: map_vec(&rep.stitches, f)?,
            to_last: Box::new(f(&rep.to_last)?),
            ..rep.clone()
        }),
        Node::Row(row) => Node::Row(Row { stitches: map_vec(&row.stitches, f)?, ..row.clone() }),
        Node::RowRepeat(rep) => Node::RowRepeat(RowRepeat {
            rows: map_vec(&rep.rows, f)?,
            times: Box::new(f(&rep.times)?),
            ..rep.clone()
        }),
        Node::Pattern(pattern) => {
            Node::Pattern(Pattern { rows: map_vec(&pattern.rows, f)?, ..pattern.clone() })
        }
        Node::Block(block) => {
            Node::Block(Block { patterns: map_vec(&block.patterns, f)?, ..block.clone() })
        }
        Node::FixedBlockRepeat(rep) => Node::FixedBlockRepeat(FixedBlockRepeat {
            block: Box::new(f(&rep.block)?),
            times: Box::new(f(&rep.times)?),
            ..rep.clone()
        }),
        Node::Call(call) => Node::Call(Call {
            target: Box::new(f(&call.target)?),
            args: map_vec(&call.args, f)?,
            ..call.clone()
        }),
        Node::Natural(_) | Node::Stitch(_) | Node::Var(_) | Node::Native(_) => node.clone(),
    })
}

/// Folds `f` over the immediate children of `node`, left to right.
///
/// Leaves contribute nothing and return the accumulator unchanged.
pub fn fold_children<T>(node: &Node, init: T, f: &mut impl FnMut(T, &Node) -> T) -> T {
    fn fold_vec<T>(nodes: &[Node], init: T, f: &mut impl FnMut(T, &Node) -> T) -> T {
        nodes.iter().fold(init, |acc, n| f(acc, n))
    }

    match node {
        Node::FixedRepeat(rep) => {
            let acc = fold_vec(&rep.stitches, init, f);
            f(acc, &rep.times)
        }
        Node::ExpandingRepeat(rep) => {
            let acc = fold_vec(&rep.stitches, init, f);
            f(acc, &rep.to_last)
        }
        Node::Row(row) => fold_vec(&row.stitches, init, f),
        Node::RowRepeat(rep) => {
            let acc = fold_vec(&rep.rows, init, f);
            f(acc, &rep.times)
        }
        Node::Pattern(pattern) => fold_vec(&pattern.rows, init, f),
        Node::Block(block) => fold_vec(&block.patterns, init, f),
        Node::FixedBlockRepeat(rep) => {
            let acc = f(init, &rep.block);
            f(acc, &rep.times)
        }
        Node::Call(call) => {
            let acc = f(init, &call.target);
            fold_vec(&call.args, acc, f)
        }
        Node::Natural(_) | Node::Stitch(_) | Node::Var(_) | Node::Native(_) => init,
    }
}
