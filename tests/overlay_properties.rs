//! Property tests for the text overlay.

use proptest::prelude::*;
use ts_rewrite::{OverlayError, TextOverlay};

/// Text plus a set of pairwise disjoint edits over it, in random order.
fn text_and_disjoint_edits() -> impl Strategy<Value = (String, Vec<(usize, usize, String)>)> {
    "[a-z \n;(){}]{0,64}".prop_flat_map(|text| {
        let len = text.len();
        let cuts = prop::collection::vec(0..=len, 0..12);
        let replacements = prop::collection::vec("[A-Z?.]{0,5}", 12);
        (Just(text), cuts, replacements).prop_flat_map(|(text, mut cuts, replacements)| {
            cuts.sort_unstable();
            // Consecutive cut pairs are disjoint spans; odd leftovers are dropped
            let edits: Vec<_> = cuts
                .chunks_exact(2)
                .zip(replacements)
                .map(|(pair, replacement)| (pair[0], pair[1], replacement))
                .filter(|(start, end, _)| start < end)
                .collect();
            (Just(text), Just(edits).prop_shuffle())
        })
    })
}

/// Reference result: splice edits back to front so earlier offsets stay valid.
fn splice(text: &str, edits: &[(usize, usize, String)]) -> String {
    let mut sorted = edits.to_vec();
    sorted.sort_by_key(|(start, _, _)| *start);
    let mut out = text.to_string();
    for (start, end, replacement) in sorted.iter().rev() {
        out.replace_range(*start..*end, replacement);
    }
    out
}

proptest! {
    #[test]
    fn finalize_preserves_text_outside_edits((text, edits) in text_and_disjoint_edits()) {
        let mut overlay = TextOverlay::new(&text);
        for (start, end, replacement) in &edits {
            overlay.overwrite(*start, *end, replacement.clone()).unwrap();
        }

        prop_assert_eq!(overlay.finalize(), splice(&text, &edits));
    }

    #[test]
    fn edits_stay_sorted_and_disjoint((text, edits) in text_and_disjoint_edits()) {
        let mut overlay = TextOverlay::new(&text);
        for (start, end, replacement) in &edits {
            overlay.overwrite(*start, *end, replacement.clone()).unwrap();
        }

        for pair in overlay.edits().windows(2) {
            prop_assert!(pair[0].byte_end <= pair[1].byte_start);
        }
    }

    #[test]
    fn finalize_is_idempotent((text, edits) in text_and_disjoint_edits()) {
        let mut overlay = TextOverlay::new(&text);
        for (start, end, replacement) in &edits {
            overlay.overwrite(*start, *end, replacement.clone()).unwrap();
        }

        prop_assert_eq!(overlay.finalize(), overlay.finalize());
    }

    #[test]
    fn empty_overlay_is_identity(text in "\\PC{0,80}") {
        prop_assert_eq!(TextOverlay::new(&text).finalize(), text);
    }

    #[test]
    fn intersecting_edit_is_rejected_and_changes_nothing(
        text in "[a-z]{8,40}",
        start in 0usize..4,
        len in 2usize..4,
        shift in 1usize..2,
    ) {
        let mut overlay = TextOverlay::new(&text);
        overlay.overwrite(start, start + len, "X").unwrap();
        let before = overlay.finalize();

        let attempt = overlay.overwrite(start + shift, start + len + shift, "Y");
        let is_overlap = matches!(attempt, Err(OverlayError::Overlap { .. }));
        prop_assert!(is_overlap);
        prop_assert_eq!(overlay.len(), 1);
        prop_assert_eq!(overlay.finalize(), before);
    }
}
