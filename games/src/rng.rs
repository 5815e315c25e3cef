use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use sha3::{Digest, Sha3_256};
use uuid::Uuid;

/// Folds contributions into a running sha3-256 hash.
#[derive(Debug, Clone)]
pub struct SeedGen {
    seed_hash: [u8; 32],
}

impl SeedGen {
    pub fn new(genesis: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(genesis);

        SeedGen {
            seed_hash: hasher.finalize().into(),
        }
    }

    pub fn update(&mut self, contribution: &[u8]) {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed_hash);
        hasher.update(contribution);

        self.seed_hash = hasher.finalize().into();
    }

    pub fn seed(&self) -> [u8; 32] {
        self.seed_hash
    }
}

#[derive(Debug, Clone)]
pub struct GameRng {
    inner: StdRng,
}

impl GameRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Reproducible stream for one play of one session.
    pub fn for_session(session_id: Uuid, nonce: u64) -> Self {
        let mut seed_gen = SeedGen::new(session_id.as_bytes());
        seed_gen.update(&nonce.to_be_bytes());

        Self {
            inner: StdRng::from_seed(seed_gen.seed()),
        }
    }

    /// Uniform index in `0..len`; 0 for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    /// Uniform in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    pub fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    /// Uniform in `low..=high`.
    pub fn inclusive(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        items.choose(&mut self.inner).copied()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}
