// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Random Streams
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Seed-derived random streams.
//!
//! Every particle draws from its own generator seeded by
//! `(stream seed, particle index)`, so results do not depend on the order
//! in which work items run.

use rand::rngs::StdRng;
use rand::SeedableRng;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomStream {
    seed: u64,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent sub-stream labelled by `salt`.
    pub fn derive(&self, salt: u64) -> Self {
        Self {
            seed: splitmix64(self.seed ^ splitmix64(salt)),
        }
    }

    /// Generator owned by particle `ip` of this stream.
    pub fn particle_rng(&self, ip: usize) -> StdRng {
        let mixed = splitmix64(self.seed.wrapping_add((ip as u64).wrapping_mul(GOLDEN_GAMMA)));
        StdRng::seed_from_u64(mixed)
    }
}
