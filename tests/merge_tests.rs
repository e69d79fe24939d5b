//! Horizontal composition tests: LCM alignment, side reconciliation, tail
//! reserve widening, and block repeats.

mod common;

use common::*;
use skein::ast::{Block, Counts, FixedBlockRepeat, Node, Side};
use skein::flatten::flatten;
use skein::infer::{count_rows, infer_counts};
use skein::merge::merge_across;
use skein::stitch::Stitch;

fn counted(node: Node, available: i64) -> Node {
    infer_counts(&node, Some(available)).unwrap()
}

/// A two-row knit/purl band repeated `times` times, two stitches wide.
fn band(times: u32) -> Node {
    counted(
        row_repeat(
            vec![
                sided_row(vec![run(Stitch::Knit, 2)], Side::Right),
                sided_row(vec![run(Stitch::Purl, 2)], Side::Wrong),
            ],
            times,
        ),
        2,
    )
}

// ---
// Alignment
// ---

#[test]
fn outer_repeat_covers_the_least_frequently_repeating_sibling() {
    let merged = merge_across(&[band(3), band(1)]).unwrap();
    let Node::RowRepeat(merged) = &merged else { panic!("expected a row repeat") };

    // Both siblings iterate over two rows, so one aligned iteration holds
    // two merged rows, and the outer repeat carries the full six.
    assert_eq!(merged.rows.len(), 2);
    assert_eq!(merged.times_value().unwrap(), 3);

    let total = count_rows(&Node::RowRepeat(merged.clone())).unwrap();
    assert_eq!(total % count_rows(&band(3)).unwrap(), 0);
    assert_eq!(total % count_rows(&band(1)).unwrap(), 0);
}

#[test]
fn merged_row_counts_commute() {
    let ab = merge_across(&[band(3), band(1)]).unwrap();
    let ba = merge_across(&[band(1), band(3)]).unwrap();
    assert_eq!(count_rows(&ab).unwrap(), count_rows(&ba).unwrap());
}

// ---
// Row merging
// ---

#[test]
fn right_side_rows_concatenate_right_to_left() {
    let left = counted(pattern(vec![sided_row(vec![run(Stitch::Knit, 2)], Side::Right)]), 2);
    let right = counted(pattern(vec![sided_row(vec![run(Stitch::Purl, 3)], Side::Right)]), 3);

    let merged = merge_across(&[left, right]).unwrap();
    let Node::Pattern(merged) = &merged else { panic!("expected a pattern") };
    let Node::Row(row) = &merged.rows[0] else { panic!("expected a row") };

    let Node::FixedRepeat(first) = &row.stitches[0] else { panic!("expected a repeat") };
    assert_eq!(first.stitches, vec![st(Stitch::Purl)]);
    let Node::FixedRepeat(second) = &row.stitches[1] else { panic!("expected a repeat") };
    assert_eq!(second.stitches, vec![st(Stitch::Knit)]);
    assert_eq!(row.counts, Some(Counts { consumes: 5, produces: 5 }));
}

#[test]
fn wrong_side_rows_concatenate_left_to_right() {
    let left = counted(pattern(vec![sided_row(vec![run(Stitch::Knit, 2)], Side::Wrong)]), 2);
    let right = counted(pattern(vec![sided_row(vec![run(Stitch::Purl, 3)], Side::Wrong)]), 3);

    let merged = merge_across(&[left, right]).unwrap();
    let Node::Pattern(merged) = &merged else { panic!("expected a pattern") };
    let Node::Row(row) = &merged.rows[0] else { panic!("expected a row") };

    let Node::FixedRepeat(first) = &row.stitches[0] else { panic!("expected a repeat") };
    assert_eq!(first.stitches, vec![st(Stitch::Knit)]);
}

#[test]
fn a_sibling_on_the_other_side_is_reversed_to_the_reference() {
    let reference = counted(sided_row(vec![st(Stitch::Knit)], Side::Right), 1);
    let other = counted(
        sided_row(
            vec![st(Stitch::Knit), st(Stitch::Knit), st(Stitch::Purl)],
            Side::Wrong,
        ),
        3,
    );

    let merged = merge_across(&[reference, other]).unwrap();
    let Node::Row(row) = &merged else { panic!("expected a row") };
    assert_eq!(row.side, Some(Side::Right));
    // Right side, so the second sibling comes first, reversed: its stitches
    // flip order and each maps to its opposite-side kind.
    assert_eq!(
        row.stitches,
        vec![
            st(Stitch::Knit),
            st(Stitch::Purl),
            st(Stitch::Purl),
            st(Stitch::Knit),
        ]
    );
}

#[test]
fn expanding_repeats_reserve_the_stitches_of_later_siblings() {
    let fixed = counted(sided_row(vec![run(Stitch::Knit, 3)], Side::Right), 3);
    let open = counted(sided_row(vec![expanding(vec![st(Stitch::Knit)], 0)], Side::Right), 4);

    // Right side: the open row is placed first, with the fixed sibling's
    // three stitches after it, so its tail reserve must grow to three.
    let merged = merge_across(&[fixed, open]).unwrap();
    let Node::Row(row) = &merged else { panic!("expected a row") };
    let Node::ExpandingRepeat(rep) = &row.stitches[0] else {
        panic!("expected the expanding repeat first")
    };
    assert_eq!(rep.to_last_value().unwrap(), 3);
    let Node::FixedRepeat(tail) = &row.stitches[1] else { panic!("expected a repeat") };
    assert_eq!(tail.times_value().unwrap(), 3);
}

// ---
// Shape reconciliation
// ---

#[test]
fn mixed_row_shapes_force_full_unrolling() {
    let plain = counted(pattern(vec![sided_row(vec![st(Stitch::Knit)], Side::Wrong)]), 1);
    let repeated = counted(
        pattern(vec![row_repeat(
            vec![sided_row(vec![st(Stitch::Purl)], Side::Wrong)],
            2,
        )]),
        1,
    );

    let merged = merge_across(&[plain, repeated]).unwrap();
    let Node::Pattern(merged) = &merged else { panic!("expected a pattern") };
    assert_eq!(merged.rows.len(), 2);

    let Node::Row(first) = &merged.rows[0] else { panic!("expected a row") };
    assert_eq!(first.stitches, vec![st(Stitch::Knit), st(Stitch::Purl)]);

    // The shorter sibling is padded with an empty right-side row, so the
    // second merged row holds only the repeated sibling's stitch, reversed
    // onto the reference side.
    let Node::Row(second) = &merged.rows[1] else { panic!("expected a row") };
    assert_eq!(second.side, Some(Side::Right));
    assert_eq!(second.stitches, vec![st(Stitch::Knit)]);
}

// ---
// Block repeats
// ---

#[test]
fn repeating_a_block_widens_every_row() {
    let inner = infer_counts(
        &pattern(vec![sided_row(vec![run(Stitch::Knit, 2)], Side::Right)]),
        None,
    )
    .unwrap();
    let repeated = Node::FixedBlockRepeat(FixedBlockRepeat::new(
        Node::Block(Block::new(vec![inner])),
        3,
    ));

    let flat = flatten(&repeated, false).unwrap();
    let Node::Pattern(flat) = &flat else { panic!("expected a pattern") };
    assert_eq!(flat.counts, Some(Counts { consumes: 6, produces: 6 }));

    let Node::Row(row) = &flat.rows[0] else { panic!("expected a row") };
    let Node::FixedRepeat(rep) = &row.stitches[0] else { panic!("expected a repeat") };
    assert_eq!(rep.times_value().unwrap(), 6);
    assert_eq!(rep.stitches, vec![st(Stitch::Knit)]);
}
