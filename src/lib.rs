pub use crate::ast::{Counts, Env, Node, Side, Span};
pub use crate::diagnostics::SkeinError;
pub use crate::engine::prepare_pattern;
pub use crate::stitch::Stitch;
pub use crate::verify::{verify_pattern, Diagnostic, DiagnosticKind};

pub mod ast;
pub mod builtins;
pub mod diagnostics;
pub mod engine;
pub mod export;
pub mod flatten;
pub mod infer;
pub mod merge;
pub mod reverse;
pub mod stitch;
pub mod subst;
pub mod verify;
