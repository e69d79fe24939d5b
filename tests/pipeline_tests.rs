//! End-to-end tests for the prepare pipeline: substitution through
//! alternation, exported text, and the conservation property.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use common::*;
use skein::ast::{Block, Call, Env, FixedRepeat, Node, Pattern, Side, VarRef};
use skein::builtins::{default_env, BufferSink};
use skein::engine::prepare_pattern;
use skein::export::export_text;
use skein::flatten::flatten;
use skein::stitch::Stitch;
use skein::verify::verify_pattern;
use skein::SkeinError;

// ---
// Worked examples
// ---

#[test]
fn cast_on_knit_bind_off_exports_expected_instructions() {
    let p = pattern(vec![cast_on_row(3), knit_row(3), bind_off_row()]);
    let prepared = prepare_pattern(&p).unwrap();
    assert_eq!(
        export_text(&prepared).unwrap(),
        "CO 3.\nK 3.\n*BO; rep from * to end."
    );
    assert_eq!(verify_pattern(&prepared), vec![]);
}

#[test]
fn expanding_knit_variant_verifies_cleanly() {
    // The same swatch with the expanding repeat in the middle row instead.
    let p = pattern(vec![
        cast_on_row(3),
        row(vec![expanding(vec![st(Stitch::Knit)], 0)]),
        row(vec![run(Stitch::BindOff, 3)]),
    ]);
    assert_eq!(verify_pattern(&p), vec![]);
    let prepared = prepare_pattern(&p).unwrap();
    assert_eq!(
        export_text(&prepared).unwrap(),
        "CO 3.\n*K; rep from * to end.\nBO 3."
    );
}

// ---
// Conservation
// ---

#[test]
fn verified_patterns_conserve_stitches_row_by_row() {
    let p = pattern(vec![cast_on_row(4), knit_row(4), knit_row(4), bind_off_row()]);
    let prepared = prepare_pattern(&p).unwrap();
    assert_eq!(verify_pattern(&prepared), vec![]);

    let Node::Pattern(prepared) = prepared else { panic!("expected a pattern") };
    let mut on_needle = 0;
    for row in &prepared.rows {
        let counts = row.counts().expect("prepared rows are counted");
        assert_eq!(counts.consumes, on_needle, "row picks up exactly what is there");
        on_needle = counts.produces;
        assert!(on_needle >= 0, "the needle never goes negative");
    }
    assert_eq!(on_needle, 0, "the needle ends empty");
}

// ---
// Flattening
// ---

#[test]
fn flatten_is_idempotent_across_blocks() {
    let left = pattern(vec![sided_row(vec![run(Stitch::Knit, 2)], Side::Right)]);
    let right = pattern(vec![sided_row(vec![run(Stitch::Purl, 3)], Side::Right)]);
    let p = pattern(vec![
        cast_on_row(5),
        Node::Block(Block::new(vec![left, right])),
        bind_off_row(),
    ]);
    let prepared = prepare_pattern(&p).unwrap();
    let again = flatten(&prepared, false).unwrap();
    assert_eq!(again, prepared);
}

#[test]
fn side_by_side_blocks_merge_into_one_row() {
    let left = pattern(vec![sided_row(vec![run(Stitch::Knit, 2)], Side::Right)]);
    let right = pattern(vec![sided_row(vec![run(Stitch::Purl, 3)], Side::Right)]);
    let p = pattern(vec![
        cast_on_row(5),
        Node::Block(Block::new(vec![left, right])),
        bind_off_row(),
    ]);
    let prepared = prepare_pattern(&p).unwrap();
    assert_eq!(verify_pattern(&prepared), vec![]);
    // On the right side the merged row is read right to left, so the second
    // sibling's purls come first in the written instructions.
    assert_eq!(
        export_text(&prepared).unwrap(),
        "CO 5.\nP 3, K 2.\n*BO; rep from * to end."
    );
}

// ---
// Calls and closures
// ---

fn rib(params: Vec<String>) -> Node {
    // pattern rib(n): CO n. *K; to end. *BO; to end.
    let cast_on = row(vec![Node::FixedRepeat(FixedRepeat {
        stitches: vec![st(Stitch::CastOn)],
        times: Box::new(Node::Var(VarRef::new("n"))),
        counts: None,
        span: None,
    })]);
    Node::Pattern(Pattern::with_params(
        vec![
            cast_on,
            row(vec![expanding(vec![st(Stitch::Knit)], 0)]),
            row(vec![expanding(vec![st(Stitch::BindOff)], 0)]),
        ],
        params,
    ))
}

#[test]
fn calling_a_parametric_pattern_inlines_its_rows() {
    let mut env = Env::new();
    env.insert("rib".to_string(), rib(vec!["n".to_string()]));

    let call = Node::Call(Call::new(Node::Var(VarRef::new("rib")), vec![Node::natural(4)]));
    let mut outer = Pattern::new(vec![call]);
    outer.env = Some(env);

    let prepared = prepare_pattern(&Node::Pattern(outer)).unwrap();
    assert_eq!(verify_pattern(&prepared), vec![]);
    assert_eq!(
        export_text(&prepared).unwrap(),
        "CO 4.\n*K; rep from * to end.\n*BO; rep from * to end."
    );
}

#[test]
fn calling_with_the_wrong_arity_aborts_the_pipeline() {
    let mut env = Env::new();
    env.insert("rib".to_string(), rib(vec!["n".to_string()]));

    let call = Node::Call(Call::new(Node::Var(VarRef::new("rib")), vec![]));
    let mut outer = Pattern::new(vec![call]);
    outer.env = Some(env);

    let err = prepare_pattern(&Node::Pattern(outer)).unwrap_err();
    assert!(matches!(err, SkeinError::ArityMismatch { expected: 1, given: 0, .. }));
}

// ---
// Display builtins
// ---

#[test]
fn show_writes_instructions_through_the_sink() {
    let sink = Rc::new(RefCell::new(BufferSink::default()));
    let env = default_env(sink.clone());
    let Some(Node::Native(show)) = env.get("show") else { panic!("show is registered") };

    let p = pattern(vec![cast_on_row(3), knit_row(3), bind_off_row()]);
    show.invoke(&[p]).unwrap();
    assert_eq!(
        sink.borrow().contents(),
        "CO 3.\nK 3.\n*BO; rep from * to end.\n\n"
    );
}
