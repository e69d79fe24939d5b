//! The expression tree for knitting patterns.
//!
//! All nodes are immutable values forming a tree; every pass produces a new
//! tree rather than mutating in place. The node inventory is a closed sum
//! type with one variant per kind, so each pass is an exhaustive match and
//! adding a kind forces every pass to be revisited.
//!
//! Stitch counts (`consumes`/`produces`) live on the count-carrying kinds as
//! optional annotations. They start out `None` on parser output and are
//! filled in, immutably, by count inference; passes that need them (reversal,
//! horizontal merging) refuse to run on an uncounted tree instead of reading
//! stale values.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::SkeinError;
use crate::stitch::Stitch;

pub mod walk;

/// A lexical environment: a persistent name-to-node map.
///
/// Environments are read-only once captured by a pattern; the persistent map
/// makes capturing a cheap structural share rather than a deep copy.
pub type Env = im::HashMap<String, Node>;

/// A byte span in the source text.
///
/// Nodes synthesized by merging or reversal have no span; diagnostics must
/// tolerate its absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// The side of the fabric, either right side (RS) or wrong side (WS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Right,
    Wrong,
}

impl Side {
    /// The opposite side.
    pub fn flip(self) -> Side {
        match self {
            Side::Right => Side::Wrong,
            Side::Wrong => Side::Right,
        }
    }

    /// An infinite series alternating between sides, starting from this one.
    pub fn alternate(self) -> impl Iterator<Item = Side> {
        std::iter::successors(Some(self), |side| Some(side.flip()))
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Right => write!(f, "RS"),
            Side::Wrong => write!(f, "WS"),
        }
    }
}

/// Stitch arithmetic for one node: what it takes from the current row and
/// what it leaves for the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub consumes: i64,
    pub produces: i64,
}

impl Counts {
    pub const ZERO: Counts = Counts { consumes: 0, produces: 0 };

    pub fn scale(self, times: u32) -> Counts {
        let times = i64::from(times);
        Counts { consumes: self.consumes * times, produces: self.produces * times }
    }
}

impl std::ops::Add for Counts {
    type Output = Counts;

    fn add(self, other: Counts) -> Counts {
        Counts { consumes: self.consumes + other.consumes, produces: self.produces + other.produces }
    }
}

// ============================================================================
// NODE KINDS
// ============================================================================

/// A natural number literal: repeat counts and tail reserves.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalLit {
    pub value: u32,
    pub span: Option<Span>,
}

/// A single stitch as a leaf of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchLit {
    pub stitch: Stitch,
    pub span: Option<Span>,
}

impl StitchLit {
    /// Stitch counts are intrinsic to the kind; they never need inference.
    pub fn counts(&self) -> Counts {
        Counts { consumes: self.stitch.consumes(), produces: self.stitch.produces() }
    }
}

/// A sequence of stitches repeated a fixed number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRepeat {
    pub stitches: Vec<Node>,
    pub times: Box<Node>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A sequence of stitches repeated as many times as fit, reserving `to_last`
/// stitches at the end of the row. Its repeat count is solvable only once
/// the number of available stitches is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandingRepeat {
    pub stitches: Vec<Node>,
    pub to_last: Box<Node>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// One row of the pattern: a fixed repeat with `times = 1` plus a fabric
/// side. `inferred` records whether the side was written by the author or
/// filled in by side inference (inferred sides may be overwritten later).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub stitches: Vec<Node>,
    pub side: Option<Side>,
    pub inferred: bool,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A sequence of rows repeated a fixed number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRepeat {
    pub rows: Vec<Node>,
    pub times: Box<Node>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A complete pattern: a row repeat with `times = 1`, formal parameters, and
/// an optional captured lexical environment fixing the meaning of its free
/// names at the point it was defined.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub rows: Vec<Node>,
    pub params: Vec<String>,
    pub env: Option<Env>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A horizontal placement of sibling patterns occupying disjoint stitches of
/// the same physical rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub patterns: Vec<Node>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A block repeated horizontally a fixed number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedBlockRepeat {
    pub block: Box<Node>,
    pub times: Box<Node>,
    pub counts: Option<Counts>,
    pub span: Option<Span>,
}

/// A named lookup. Eliminated by substitution; must not survive past it.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub span: Option<Span>,
}

/// A pattern invocation with positional arguments. Eliminated by
/// substitution; must not survive past it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: Box<Node>,
    pub args: Vec<Node>,
    pub span: Option<Span>,
}

/// A host-provided callable, invoked like a pattern call but outside the
/// tree-rewriting rules. May return a node, or nothing for side-effecting
/// builtins such as display.
pub type NativeFn = dyn Fn(&[Node]) -> Result<Option<Node>, SkeinError>;

#[derive(Clone)]
pub struct NativeFunction {
    name: &'static str,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new(name: &'static str, func: Rc<NativeFn>) -> Self {
        NativeFunction { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, args: &[Node]) -> Result<Option<Node>, SkeinError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Rc::ptr_eq(&self.func, &other.func)
    }
}

// ============================================================================
// THE NODE SUM TYPE
// ============================================================================

/// Any node of the pattern tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Natural(NaturalLit),
    Stitch(StitchLit),
    FixedRepeat(FixedRepeat),
    ExpandingRepeat(ExpandingRepeat),
    Row(Row),
    RowRepeat(RowRepeat),
    Pattern(Pattern),
    Block(Block),
    FixedBlockRepeat(FixedBlockRepeat),
    Var(VarRef),
    Call(Call),
    Native(NativeFunction),
}

impl Node {
    /// A natural number literal with no span.
    pub fn natural(value: u32) -> Node {
        Node::Natural(NaturalLit { value, span: None })
    }

    /// A stitch leaf with no span.
    pub fn stitch(stitch: Stitch) -> Node {
        Node::Stitch(StitchLit { stitch, span: None })
    }

    /// The source span of this node, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Node::Natural(n) => n.span,
            Node::Stitch(n) => n.span,
            Node::FixedRepeat(n) => n.span,
            Node::ExpandingRepeat(n) => n.span,
            Node::Row(n) => n.span,
            Node::RowRepeat(n) => n.span,
            Node::Pattern(n) => n.span,
            Node::Block(n) => n.span,
            Node::FixedBlockRepeat(n) => n.span,
            Node::Var(n) => n.span,
            Node::Call(n) => n.span,
            Node::Native(_) => None,
        }
    }

    /// The stitch counts of this node, if it is a knitting action whose
    /// counts are known. Stitch leaves always know theirs.
    pub fn counts(&self) -> Option<Counts> {
        match self {
            Node::Stitch(lit) => Some(lit.counts()),
            Node::FixedRepeat(n) => n.counts,
            Node::ExpandingRepeat(n) => n.counts,
            Node::Row(n) => n.counts,
            Node::RowRepeat(n) => n.counts,
            Node::Pattern(n) => n.counts,
            Node::Block(n) => n.counts,
            Node::FixedBlockRepeat(n) => n.counts,
            Node::Natural(_) | Node::Var(_) | Node::Call(_) | Node::Native(_) => None,
        }
    }

    pub fn consumes(&self) -> Option<i64> {
        self.counts().map(|c| c.consumes)
    }

    pub fn produces(&self) -> Option<i64> {
        self.counts().map(|c| c.produces)
    }

    /// The kind of this node as a short name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Natural(_) => "natural number",
            Node::Stitch(_) => "stitch",
            Node::FixedRepeat(_) => "fixed repeat",
            Node::ExpandingRepeat(_) => "expanding repeat",
            Node::Row(_) => "row",
            Node::RowRepeat(_) => "row repeat",
            Node::Pattern(_) => "pattern",
            Node::Block(_) => "block",
            Node::FixedBlockRepeat(_) => "block repeat",
            Node::Var(_) => "variable",
            Node::Call(_) => "call",
            Node::Native(_) => "native function",
        }
    }

    /// Compact one-line rendering, for diagnostics and display builtins.
    pub fn pretty(&self) -> String {
        fn join(nodes: &[Node]) -> String {
            nodes.iter().map(Node::pretty).collect::<Vec<_>>().join(" ")
        }
        match self {
            Node::Natural(n) => n.value.to_string(),
            Node::Stitch(n) => n.stitch.symbol().to_string(),
            Node::FixedRepeat(n) => format!("(rep {} {})", n.times.pretty(), join(&n.stitches)),
            Node::ExpandingRepeat(n) => {
                format!("(rep-to-last {} {})", n.to_last.pretty(), join(&n.stitches))
            }
            Node::Row(n) => match n.side {
                Some(side) => format!("(row {} {})", side, join(&n.stitches)),
                None => format!("(row {})", join(&n.stitches)),
            },
            Node::RowRepeat(n) => format!("(rows {} {})", n.times.pretty(), join(&n.rows)),
            Node::Pattern(n) => {
                if n.params.is_empty() {
                    format!("(pattern {})", join(&n.rows))
                } else {
                    format!("(pattern [{}] {})", n.params.join(" "), join(&n.rows))
                }
            }
            Node::Block(n) => format!("(block {})", join(&n.patterns)),
            Node::FixedBlockRepeat(n) => {
                format!("(block-rep {} {})", n.times.pretty(), n.block.pretty())
            }
            Node::Var(n) => n.name.clone(),
            Node::Call(n) => {
                if n.args.is_empty() {
                    format!("({})", n.target.pretty())
                } else {
                    format!("({} {})", n.target.pretty(), join(&n.args))
                }
            }
            Node::Native(n) => format!("<native {}>", n.name()),
        }
    }
}

/// The value of a natural literal node, if that is what this node is.
pub fn natural_value(node: &Node) -> Option<u32> {
    match node {
        Node::Natural(lit) => Some(lit.value),
        _ => None,
    }
}

fn natural_or_type_error(node: &Node, what: &str) -> Result<u32, SkeinError> {
    natural_value(node).ok_or_else(|| {
        SkeinError::type_error(
            format!("{what} must be a natural number, found {}", node.kind_name()),
            node.span(),
        )
    })
}

// ============================================================================
// CONSTRUCTORS AND VIEWS
// ============================================================================

impl FixedRepeat {
    pub fn new(stitches: Vec<Node>, times: u32) -> Self {
        FixedRepeat {
            stitches,
            times: Box::new(Node::natural(times)),
            counts: None,
            span: None,
        }
    }

    pub fn times_value(&self) -> Result<u32, SkeinError> {
        natural_or_type_error(&self.times, "repeat count")
    }
}

impl ExpandingRepeat {
    pub fn new(stitches: Vec<Node>, to_last: u32) -> Self {
        ExpandingRepeat {
            stitches,
            to_last: Box::new(Node::natural(to_last)),
            counts: None,
            span: None,
        }
    }

    pub fn to_last_value(&self) -> Result<u32, SkeinError> {
        natural_or_type_error(&self.to_last, "tail reserve")
    }

    /// One unit of the repeat, viewed as a fixed repeat of a single pass.
    pub fn as_fixed(&self) -> FixedRepeat {
        FixedRepeat {
            stitches: self.stitches.clone(),
            times: Box::new(Node::natural(1)),
            counts: None,
            span: self.span,
        }
    }
}

impl Row {
    pub fn new(stitches: Vec<Node>) -> Self {
        Row { stitches, side: None, inferred: false, counts: None, span: None }
    }

    pub fn with_side(stitches: Vec<Node>, side: Side) -> Self {
        Row { stitches, side: Some(side), inferred: false, counts: None, span: None }
    }

    /// This row viewed as the fixed repeat it is (`times = 1`).
    pub fn as_fixed(&self) -> FixedRepeat {
        FixedRepeat {
            stitches: self.stitches.clone(),
            times: Box::new(Node::natural(1)),
            counts: self.counts,
            span: self.span,
        }
    }
}

impl RowRepeat {
    pub fn new(rows: Vec<Node>, times: u32) -> Self {
        RowRepeat { rows, times: Box::new(Node::natural(times)), counts: None, span: None }
    }

    pub fn times_value(&self) -> Result<u32, SkeinError> {
        natural_or_type_error(&self.times, "repeat count")
    }
}

impl Pattern {
    pub fn new(rows: Vec<Node>) -> Self {
        Pattern { rows, params: Vec::new(), env: None, counts: None, span: None }
    }

    pub fn with_params(rows: Vec<Node>, params: Vec<String>) -> Self {
        Pattern { rows, params, env: None, counts: None, span: None }
    }

    /// This pattern viewed as the row repeat it is (`times = 1`).
    pub fn as_row_repeat(&self) -> RowRepeat {
        RowRepeat {
            rows: self.rows.clone(),
            times: Box::new(Node::natural(1)),
            counts: self.counts,
            span: self.span,
        }
    }
}

impl Block {
    pub fn new(patterns: Vec<Node>) -> Self {
        Block { patterns, counts: None, span: None }
    }
}

impl FixedBlockRepeat {
    pub fn new(block: Node, times: u32) -> Self {
        FixedBlockRepeat {
            block: Box::new(block),
            times: Box::new(Node::natural(times)),
            counts: None,
            span: None,
        }
    }

    pub fn times_value(&self) -> Result<u32, SkeinError> {
        natural_or_type_error(&self.times, "repeat count")
    }
}

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        VarRef { name: name.into(), span: None }
    }
}

impl Call {
    pub fn new(target: Node, args: Vec<Node>) -> Self {
        Call { target: Box::new(target), args, span: None }
    }
}

impl From<NaturalLit> for Node {
    fn from(n: NaturalLit) -> Node {
        Node::Natural(n)
    }
}

impl From<StitchLit> for Node {
    fn from(n: StitchLit) -> Node {
        Node::Stitch(n)
    }
}

impl From<FixedRepeat> for Node {
    fn from(n: FixedRepeat) -> Node {
        Node::FixedRepeat(n)
    }
}

impl From<ExpandingRepeat> for Node {
    fn from(n: ExpandingRepeat) -> Node {
        Node::ExpandingRepeat(n)
    }
}

impl From<Row> for Node {
    fn from(n: Row) -> Node {
        Node::Row(n)
    }
}

impl From<RowRepeat> for Node {
    fn from(n: RowRepeat) -> Node {
        Node::RowRepeat(n)
    }
}

impl From<Pattern> for Node {
    fn from(n: Pattern) -> Node {
        Node::Pattern(n)
    }
}

impl From<Block> for Node {
    fn from(n: Block) -> Node {
        Node::Block(n)
    }
}

impl From<FixedBlockRepeat> for Node {
    fn from(n: FixedBlockRepeat) -> Node {
        Node::FixedBlockRepeat(n)
    }
}

impl From<VarRef> for Node {
    fn from(n: VarRef) -> Node {
        Node::Var(n)
    }
}

impl From<Call> for Node {
    fn from(n: Call) -> Node {
        Node::Call(n)
    }
}

impl From<NativeFunction> for Node {
    fn from(n: NativeFunction) -> Node {
        Node::Native(n)
    }
}
