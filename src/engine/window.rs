//! Sliding-window schedule.

use std::ops::Range;

/// Windows visited when reranking `[rank_start, rank_end)`, in visiting order.
///
/// The first window ends at `rank_end`; every following window is shifted
/// `step` positions towards the front, its start clamped to `rank_start`.
/// Iteration stops once the window end reaches `rank_start` or the previous
/// window already started exactly at `rank_start`.
///
/// Callers must pass non-zero `window_size` and `step`.
pub fn window_schedule(
    rank_start: usize,
    rank_end: usize,
    window_size: usize,
    step: usize,
) -> Vec<Range<usize>> {
    let rank_start = rank_start as i64;
    let step = step as i64;
    let mut end = rank_end as i64;
    let mut start = end - window_size as i64;
    let mut windows = Vec::new();

    while end > rank_start && start + step != rank_start {
        start = start.max(rank_start);
        windows.push(start as usize..end as usize);
        end -= step;
        start -= step;
    }
    windows
}
