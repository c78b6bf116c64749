//! Permutation parsing and repair.
//!
//! Listwise models answer with identifier chains such as `[3] > [1] > [2]`.
//! Identifiers are 1-based in the text and 0-based everywhere else.

use crate::types::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Extract 0-based indices from a model response, in order of appearance.
///
/// Every run of digits counts as an identifier; `0` and values that do not
/// fit in `usize` are skipped.
pub fn parse_permutation(response: &str) -> Vec<usize> {
    NUMBER
        .find_iter(response)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter(|&id| id > 0)
        .map(|id| id - 1)
        .collect()
}

/// Turn a raw, possibly noisy permutation into a complete one over `0..len`.
///
/// Out-of-range and repeated indices are dropped; indices the model left out
/// are appended in their current order.
pub fn repair_permutation(raw: &[usize], len: usize) -> Vec<usize> {
    let mut seen = vec![false; len];
    let mut order = Vec::with_capacity(len);
    for &idx in raw {
        if idx < len && !seen[idx] {
            seen[idx] = true;
            order.push(idx);
        }
    }
    order.extend((0..len).filter(|&idx| !seen[idx]));
    order
}

/// Reorder `window` in place so that position `i` holds the candidate
/// previously at `order[i]`. `order` must be a complete permutation.
pub fn apply_permutation(window: &mut [Candidate], order: &[usize]) {
    debug_assert_eq!(window.len(), order.len());
    let original = window.to_vec();
    for (slot, &from) in window.iter_mut().zip(order) {
        *slot = original[from].clone();
    }
}
