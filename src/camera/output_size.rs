//! Output size negotiation.

use crate::geometry::Size;

/// Picks the narrowest size wider than `min_width`, else the widest size.
///
/// Smaller frames are cheaper to decode, so the first size that satisfies
/// the detector's guidance wins. Ties keep the earliest entry. Returns
/// `None` only for an empty list.
pub fn choose_output_size(sizes: &[Size], min_width: u32) -> Option<Size> {
    let mut narrowest_above: Option<Size> = None;
    let mut widest: Option<Size> = None;

    for &size in sizes {
        if size.width > min_width && narrowest_above.map_or(true, |n| size.width < n.width) {
            narrowest_above = Some(size);
        }
        if widest.map_or(true, |w| size.width > w.width) {
            widest = Some(size);
        }
    }

    narrowest_above.or(widest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn widths(ws: &[u32]) -> Vec<Size> {
        ws.iter().map(|&w| Size::new(w, w)).collect()
    }

    #[test]
    fn test_narrowest_above_minimum() {
        let chosen = choose_output_size(&widths(&[1, 2, 4, 5]), 3).unwrap();
        assert_eq!(chosen.width, 4);
    }

    #[test]
    fn test_all_above_minimum() {
        let chosen = choose_output_size(&widths(&[2, 3]), 1).unwrap();
        assert_eq!(chosen.width, 2);
    }

    #[test]
    fn test_none_above_minimum_picks_widest() {
        let chosen = choose_output_size(&widths(&[1, 2]), 3).unwrap();
        assert_eq!(chosen.width, 2);
    }

    #[test]
    fn test_equal_width_is_not_enough() {
        let chosen = choose_output_size(&widths(&[3, 6]), 3).unwrap();
        assert_eq!(chosen.width, 6);
    }

    #[test]
    fn test_ties_keep_first() {
        let sizes = [Size::new(1280, 720), Size::new(1280, 960), Size::new(640, 480)];
        assert_eq!(choose_output_size(&sizes, 1000), Some(Size::new(1280, 720)));
    }

    #[test]
    fn test_empty() {
        assert_eq!(choose_output_size(&[], 100), None);
    }

    proptest! {
        #[test]
        fn prop_choice_is_member_and_minimal(
            ws in proptest::collection::vec(1u32..5000, 1..20),
            min in 0u32..5000,
        ) {
            let sizes = widths(&ws);
            let chosen = choose_output_size(&sizes, min).unwrap();
            prop_assert!(sizes.contains(&chosen));
            if ws.iter().any(|&w| w > min) {
                prop_assert!(chosen.width > min);
                prop_assert!(ws.iter().filter(|&&w| w > min).all(|&w| w >= chosen.width));
            } else {
                prop_assert!(ws.iter().all(|&w| w <= chosen.width));
            }
        }
    }
}
