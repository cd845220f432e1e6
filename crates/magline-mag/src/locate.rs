//! Exact-match lookup in a sorted key sequence.

/// Position of `target` in the ascending `keys`, or `None` when absent.
///
/// With duplicates the leftmost match is returned. Runs in O(log n).
pub fn locate<K: Ord>(keys: &[K], target: &K) -> Option<usize> {
    let pos = keys.partition_point(|k| k < target);
    keys.get(pos).filter(|k| *k == target).map(|_| pos)
}
