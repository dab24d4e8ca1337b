// Direct port of the dungeon engine's 32-bit linear congruential generator.
//
// We port the LCG rather than using an ecosystem RNG because the preview
// generator must consume the exact same value stream as the game for a
// given seed, or seeded previews stop matching the real floor.

const MULTIPLIER: u32 = 0x5D58_8B65;
const INCREMENT: u32 = 1;

/// The engine RNG: one 32-bit LCG state, 16-bit outputs.
///
/// Every draw advances the state once; bounded draws use the engine's
/// multiply-shift reduction rather than modulo, so the consumed stream is
/// identical to the game's regardless of the bound.
#[derive(Debug, Clone)]
pub struct DungeonRng {
    state: u32,
}

impl DungeonRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Raw 16-bit draw: advance the LCG and return the upper half of the
    /// state.
    pub fn rand16(&mut self) -> u16 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        (self.state >> 16) as u16
    }

    /// `0 <= rand_max(x) < x`, via the engine's `(draw * x) >> 16`
    /// reduction. A non-positive bound consumes nothing and returns 0.
    pub fn rand_max(&mut self, x: u32) -> u32 {
        if x == 0 {
            log::warn!("rand_max(0) attempted");
            return 0;
        }
        (u32::from(self.rand16()) * x) >> 16
    }

    /// A spawn-table roll: `0 <= roll < 10000`.
    pub fn roll10000(&mut self) -> u16 {
        self.rand_max(10_000) as u16
    }

    /// `lo <= rand_range(lo, hi) < hi`. Swapped bounds are tolerated.
    pub fn rand_range(&mut self, lo: u32, hi: u32) -> u32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if hi - lo == 0 {
            return lo;
        }
        lo + self.rand_max(hi - lo)
    }

    /// One-in-`x` chance. `x == 0` is always false.
    pub fn one_in(&mut self, x: u32) -> bool {
        x != 0 && self.rand_max(x) == 0
    }

    /// Percentage roll against a 0..=100 chance value.
    pub fn chance(&mut self, percent: u8) -> bool {
        self.rand_max(100) < u32::from(percent.min(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand16_matches_engine_seed_0() {
        let mut rng = DungeonRng::new(0);
        let expected = [0, 23896, 57519, 12198, 42517, 17316, 46647, 35812, 53035, 34932];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(rng.rand16(), e, "rand16 mismatch at index {i}");
        }
    }

    #[test]
    fn rand16_matches_engine_seed_42() {
        let mut rng = DungeonRng::new(42);
        let expected = [
            20614, 59799, 54589, 40405, 32638, 4054, 50324, 38298, 13604, 48140,
        ];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(rng.rand16(), e, "rand16 mismatch at index {i}");
        }
    }

    #[test]
    fn rand16_matches_engine_seed_12345() {
        let mut rng = DungeonRng::new(12345);
        let expected = [
            25305, 58310, 52998, 21936, 31662, 28007, 46092, 59828, 48863, 27153,
        ];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(rng.rand16(), e, "rand16 mismatch at index {i}");
        }
    }

    #[test]
    fn rand_max_matches_engine_seed_42() {
        let mut rng = DungeonRng::new(42);
        let expected = [
            31, 91, 83, 61, 49, 6, 76, 58, 20, 73, 14, 39, 74, 63, 67, 86, 91, 61, 99, 49,
        ];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(rng.rand_max(100), e, "rand_max(100) mismatch at index {i}");
        }
    }

    #[test]
    fn roll10000_matches_engine_seed_12345() {
        let mut rng = DungeonRng::new(12345);
        let expected = [3861, 8897, 8086, 3347, 4831, 4273, 7033, 9129, 7455, 4143];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(rng.roll10000(), e, "roll10000 mismatch at index {i}");
        }
    }

    #[test]
    fn rand_max_range() {
        let mut rng = DungeonRng::new(42);
        for _ in 0..1000 {
            let v = rng.rand_max(50);
            assert!(v < 50, "rand_max(50) = {v} out of range");
        }
    }

    #[test]
    fn rand_range_bounds() {
        let mut rng = DungeonRng::new(7);
        for _ in 0..1000 {
            let v = rng.rand_range(3, 9);
            assert!((3..9).contains(&v), "rand_range(3, 9) = {v} out of range");
        }
    }

    #[test]
    fn rand_range_swapped_and_empty() {
        let mut rng = DungeonRng::new(7);
        assert_eq!(rng.rand_range(5, 5), 5);
        let v = rng.rand_range(9, 3);
        assert!((3..9).contains(&v));
    }

    #[test]
    fn rand_max_zero_consumes_nothing() {
        let mut a = DungeonRng::new(99);
        let mut b = DungeonRng::new(99);
        assert_eq!(a.rand_max(0), 0);
        // The zero-bound call must not have advanced the stream.
        assert_eq!(a.rand16(), b.rand16());
    }

    #[test]
    fn determinism() {
        let mut a = DungeonRng::new(999);
        let mut b = DungeonRng::new(999);
        for _ in 0..100 {
            assert_eq!(a.roll10000(), b.roll10000());
        }
    }

    #[test]
    fn chance_extremes() {
        let mut rng = DungeonRng::new(1);
        for _ in 0..100 {
            assert!(rng.chance(100));
            assert!(!rng.chance(0));
        }
    }
}
