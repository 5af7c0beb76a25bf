use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// What a random stream is drawn for. Each purpose gets unrelated streams from the same
/// seed, so re-mining a store for clustering does not reuse the mining permutations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Purpose {
    Mining,
    Linking,
    Search,
}

impl Purpose {
    fn salt(&self) -> u64 {
        match *self {
            Purpose::Mining => 0x6d69_6e65,
            Purpose::Linking => 0x6c69_6e6b,
            Purpose::Search => 0x7365_6172,
        }
    }
}

/// Seedable random engine for Min-Hashing.
///
/// The engine never hands out a shared cursor: every hash table draws from its own
/// substream, identified by the seed, a [`Purpose`] and the table index. Given the same
/// seed, the draws of a table are the same no matter in which order, or on which thread,
/// tables and rows are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MhRng {
    seed: u64,
}

impl MhRng {
    pub fn new(seed: u64) -> Self {
        MhRng { seed }
    }

    /// Creates an engine from a nondeterministic seed. The seed is kept so that the run can
    /// be reproduced with [`MhRng::new`].
    pub fn from_entropy() -> Self {
        MhRng { seed: rand::random::<u64>() }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Substream for hash table `table`.
    pub fn stream(&self, purpose: Purpose, table: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ purpose.salt().rotate_left(32));
        rng.set_stream(table as u64);
        rng
    }
}

impl Default for MhRng {
    fn default() -> Self {
        MhRng::from_entropy()
    }
}
