/// Road lengths and vehicle ranges, in the unit of the segment file.
pub type Meters = u64;

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<K> = rustc_hash::FxHashSet<K>;

pub fn map_new<K, V>() -> HashMap<K, V> {
    rustc_hash::FxHashMap::default()
}

pub fn set_new<K>() -> HashSet<K> {
    rustc_hash::FxHashSet::default()
}

/// Solver values above this count as a set binary.
pub const BINARY_THRESHOLD: f64 = 0.5;

/// `d <= range / 2`, without truncating odd ranges.
pub fn within_half_range(distance: Meters, range: Meters) -> bool {
    distance.saturating_mul(2) <= range
}

#[cfg(test)]
mod tests {
    use super::within_half_range;

    #[test]
    fn test_half_range_odd() {
        assert!(within_half_range(50, 101));
        assert!(!within_half_range(51, 101));
        assert!(within_half_range(50, 100));
        assert!(!within_half_range(51, 100));
        assert!(within_half_range(0, 0));
    }
}
