use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// RandMode controls random generator behaviour. May be predictable for testing or truly random for gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandMode {
    Predictable,
    RandomUniform,
}

pub struct ZRand {
    rng: Box<dyn RngCore>,
    rand_mode: RandMode,
}

impl ZRand {
    pub fn new_uniform() -> ZRand {
        ZRand {
            rng: Box::new(rand::thread_rng()),
            rand_mode: RandMode::RandomUniform,
        }
    }

    pub fn new_predictable(seed: u64) -> ZRand {
        ZRand {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            rand_mode: RandMode::Predictable,
        }
    }

    /// Seeded when a seed is given, otherwise from entropy
    pub fn from_seed(seed: Option<u64>) -> ZRand {
        match seed {
            Some(seed) => ZRand::new_predictable(seed),
            None => ZRand::new_uniform(),
        }
    }

    pub fn mode(&self) -> RandMode {
        self.rand_mode
    }

    /// Random integer in the inclusive range between `from` and `to`,
    /// in either order
    pub fn random_integer(&mut self, from: i32, to: i32) -> i32 {
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        self.rng.gen_range(low..=high)
    }
}
