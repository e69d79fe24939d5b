//! The unified error type for every pipeline-aborting failure.
//!
//! Skein splits failures into two channels. Errors in this module abort the
//! pass that raised them and propagate out through `Result`: later passes
//! assume well-formed input, so there is nothing sensible to continue with.
//! The verifier deliberately does not use this channel; it accumulates plain
//! [`crate::verify::Diagnostic`] values so an author sees every problem in a
//! pattern, not just the first.
//!
//! Every variant carries an optional source span. Nodes that came from the
//! parser have one; nodes synthesized by merging or reversal do not, and the
//! error message must stand on its own in that case.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::ast::Span;
use crate::stitch::Stitch;

/// Converts an AST span into a miette source span for labeled reports.
pub fn to_source_span(span: Span) -> SourceSpan {
    let len = if span.end > span.start { span.end - span.start } else { 1 };
    SourceSpan::new(span.start.into(), len)
}

fn label(span: Option<Span>) -> Option<SourceSpan> {
    span.map(to_source_span)
}

/// An error that aborts the compilation pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum SkeinError {
    #[error("unbound name `{name}`")]
    #[diagnostic(code(skein::subst::unbound_name))]
    UnboundName {
        name: String,
        #[label("not defined in this scope")]
        span: Option<SourceSpan>,
    },

    #[error("called pattern with {given} arguments, but expected {expected}")]
    #[diagnostic(code(skein::subst::arity_mismatch))]
    ArityMismatch {
        expected: usize,
        given: usize,
        #[label("this call")]
        span: Option<SourceSpan>,
    },

    #[error("ambiguous use of expanding stitch repeat")]
    #[diagnostic(
        code(skein::infer::ambiguous_repeat),
        help("an expanding repeat can only be resolved once the number of available stitches is known")
    )]
    AmbiguousRepeat {
        #[label("cannot tell how many times this repeats")]
        span: Option<SourceSpan>,
    },

    #[error("cannot reverse stitch {stitch}")]
    #[diagnostic(code(skein::reverse::irreversible))]
    Irreversible {
        stitch: Stitch,
        #[label("has no wrong-side equivalent")]
        span: Option<SourceSpan>,
    },

    #[error(
        "{pattern_width}\u{d7}{pattern_height} pattern does not fit evenly into \
         {width}\u{d7}{height} fill box"
    )]
    #[diagnostic(code(skein::builtins::non_even_fill))]
    NonEvenFill {
        pattern_width: i64,
        pattern_height: u64,
        width: u32,
        height: u32,
        #[label("tiled here")]
        span: Option<SourceSpan>,
    },

    #[error("type error: {message}")]
    #[diagnostic(code(skein::type_error))]
    Type {
        message: String,
        #[label]
        span: Option<SourceSpan>,
    },

    #[error("internal error: {message}")]
    #[diagnostic(code(skein::internal))]
    Internal { message: String },
}

impl SkeinError {
    pub fn unbound(name: impl Into<String>, span: Option<Span>) -> Self {
        SkeinError::UnboundName { name: name.into(), span: label(span) }
    }

    pub fn arity(expected: usize, given: usize, span: Option<Span>) -> Self {
        SkeinError::ArityMismatch { expected, given, span: label(span) }
    }

    pub fn ambiguous(span: Option<Span>) -> Self {
        SkeinError::AmbiguousRepeat { span: label(span) }
    }

    pub fn irreversible(stitch: Stitch, span: Option<Span>) -> Self {
        SkeinError::Irreversible { stitch, span: label(span) }
    }

    pub fn non_even_fill(
        pattern_width: i64,
        pattern_height: u64,
        width: u32,
        height: u32,
        span: Option<Span>,
    ) -> Self {
        SkeinError::NonEvenFill { pattern_width, pattern_height, width, height, span: label(span) }
    }

    pub fn type_error(message: impl Into<String>, span: Option<Span>) -> Self {
        SkeinError::Type { message: message.into(), span: label(span) }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SkeinError::Internal { message: message.into() }
    }
}
