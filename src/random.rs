// Single seedable randomness source for particle placement and the evasive button.
use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Resource)]
pub struct CardRng(pub StdRng);

impl CardRng {
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        CardRng(StdRng::seed_from_u64(seed))
    }
}

impl Default for CardRng {
    fn default() -> Self {
        CardRng(StdRng::from_os_rng())
    }
}
