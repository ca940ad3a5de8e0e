use super::Version;

/// Sparse-checkpoint filter: every version is logically a checkpoint
/// point, only every `interval`-th is persisted.
#[derive(Debug, Clone, Copy)]
pub struct NthIterationFilter {
    interval: u64,
}

impl NthIterationFilter {
    pub fn new(interval: u64) -> Self {
        assert!(interval > 0);
        NthIterationFilter { interval }
    }

    pub fn accepts(&self, version: Version) -> bool {
        version % self.interval == 0
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn accepts_multiples_of_the_interval() {
        let filter = NthIterationFilter::new(3);
        assert!(!filter.accepts(1));
        assert!(!filter.accepts(2));
        assert!(filter.accepts(3));
        assert!(!filter.accepts(4));
        assert!(filter.accepts(6));
    }

    #[test]
    fn interval_one_accepts_everything() {
        let filter = NthIterationFilter::new(1);
        for version in 1..10 {
            assert!(filter.accepts(version));
        }
    }
}
