//! Deterministic 128-bit xorshift generator
//!
//! Every stochastic step of the pipeline draws from a single [`XorShift128`]
//! stream in a fixed order, so a given seed always produces the same planet.
//! The generator implements the `rand` traits, which lets the generation code
//! use `Rng::gen_range` and friends.

use rand::{Error, RngCore, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// State words used when a seed word is zero (Marsaglia's reference values)
const DEFAULT_STATE: [u32; 4] = [123_456_789, 362_436_069, 521_288_629, 88_675_123];

/// Marsaglia xorshift128 generator with four 32-bit state words
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift128 {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl XorShift128 {
    /// Create a generator from four seed words
    ///
    /// Zero words are replaced with fixed defaults so the state can never be
    /// all zeros (which would make the generator emit zeros forever).
    pub fn new(seed: [u32; 4]) -> Self {
        let pick = |i: usize| if seed[i] == 0 { DEFAULT_STATE[i] } else { seed[i] };
        Self {
            x: pick(0),
            y: pick(1),
            z: pick(2),
            w: pick(3),
        }
    }

    /// Current state words, usable to resume the stream later
    pub fn state(&self) -> [u32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    #[inline]
    fn step(&mut self) -> u32 {
        let t = self.x ^ (self.x << 11);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w = (self.w ^ (self.w >> 19)) ^ (t ^ (t >> 8));
        self.w
    }
}

impl Default for XorShift128 {
    fn default() -> Self {
        Self::new(DEFAULT_STATE)
    }
}

impl RngCore for XorShift128 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.step());
        let hi = u64::from(self.step());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift128 {
    type Seed = [u8; 16];

    fn from_seed(seed: Self::Seed) -> Self {
        let mut words = [0u32; 4];
        for (word, bytes) in words.iter_mut().zip(seed.chunks_exact(4)) {
            *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        Self::new(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_reference_sequence() {
        // First outputs of xorshift128 with Marsaglia's default state
        let mut rng = XorShift128::default();
        assert_eq!(rng.next_u32(), 3_701_687_786);
        assert_eq!(rng.next_u32(), 458_299_110);
    }

    #[test]
    fn test_determinism() {
        let mut a = XorShift128::new([1, 2, 3, 4]);
        let mut b = XorShift128::new([1, 2, 3, 4]);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = XorShift128::new([1, 2, 3, 4]);
        let mut b = XorShift128::new([4, 3, 2, 1]);
        let same = (0..32).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 32);
    }

    #[test]
    fn test_zero_seed_is_not_stuck() {
        let mut rng = XorShift128::new([0, 0, 0, 0]);
        assert_eq!(rng.state(), DEFAULT_STATE);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_from_seed_matches_new() {
        let mut bytes = [0u8; 16];
        bytes[0] = 5;
        bytes[4] = 6;
        bytes[8] = 7;
        bytes[12] = 8;
        assert_eq!(XorShift128::from_seed(bytes), XorShift128::new([5, 6, 7, 8]));
    }

    #[test]
    fn test_ranges() {
        let mut rng = XorShift128::new([9, 8, 7, 6]);
        for _ in 0..1000 {
            let v: f32 = rng.gen_range(-0.8..=-0.3);
            assert!((-0.8..=-0.3).contains(&v));
            let i = rng.gen_range(4..=7);
            assert!((4..=7).contains(&i));
        }
    }
}
