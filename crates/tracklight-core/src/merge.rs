//! Adjacent/overlapping span merging.
//!
//! A composite token can cover several disjoint character ranges. Before
//! one provenance record is written for it, ranges that overlap or touch
//! are coalesced so the stored `text_location` stays compact.
//!
//! # Algorithm
//!
//! Ranges are consumed in input order (no sorting). The running range is
//! extended whenever the next range starts at or before `running_high + 1`;
//! otherwise the running range is emitted and a new one begins.
//!
//! # Example
//!
//! ```rust
//! use tracklight_core::merge::merge_adjacent_text_locations;
//!
//! let merged = merge_adjacent_text_locations(&[(5, 10), (11, 20), (30, 40)]);
//! assert_eq!(merged, vec![(5, 20), (30, 40)]);
//! ```

/// Merge touching or overlapping ranges, sequentially, in input order.
///
/// Empty input yields an empty list.
pub fn merge_adjacent_text_locations(text_locations: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let Some(&(first_low, first_high)) = text_locations.first() else {
        return Vec::new();
    };

    let mut current_low = first_low;
    let mut current_high = first_high;
    let mut output = Vec::new();

    for &(low, high) in &text_locations[1..] {
        if low <= current_high + 1 {
            current_high = high;
        } else {
            output.push((current_low, current_high));
            current_low = low;
            current_high = high;
        }
    }
    output.push((current_low, current_high));

    output
}

/// Render ranges as the stored `text_location` string: `"low-high,low-high"`.
pub fn format_text_location(ranges: &[(usize, usize)]) -> String {
    ranges
        .iter()
        .map(|(low, high)| format!("{}-{}", low, high))
        .collect::<Vec<_>>()
        .join(",")
}
