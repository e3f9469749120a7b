//! Seeded random streams for a race session.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

/// Independent RNG streams derived from one user-visible seed.
///
/// Roster conditions, field draws and per-tick pace samples each get their
/// own stream so that adding draws to one concern never shifts another.
#[derive(Debug, Clone)]
pub struct RngBundle {
    roster: CountingRng<SmallRng>,
    draw: CountingRng<SmallRng>,
    pace: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            roster: CountingRng::new(derive_stream_seed(seed, b"roster")),
            draw: CountingRng::new(derive_stream_seed(seed, b"draw")),
            pace: CountingRng::new(derive_stream_seed(seed, b"pace")),
        }
    }

    /// Stream used to assign roster conditions.
    pub fn roster(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.roster
    }

    /// Stream used to draw program fields.
    pub fn draw(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.draw
    }

    /// Stream used for per-tick speed variance.
    pub fn pace(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.pace
    }

    /// Total draws across every stream.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.roster
            .draws()
            .saturating_add(self.draw.draws())
            .saturating_add(self.pace.draws())
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so keying cannot fail.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
