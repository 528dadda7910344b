/// Xorshift64* generator. Deterministic for a given seed, which keeps
/// trial perturbations reproducible in tests.
#[derive(Copy, Clone, Debug)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn init(seed: u64) -> Self {
        // State must be non-zero or the sequence collapses to zero.
        Self {
            state: seed.max(1),
        }
    }

    /// Seed from the system clock for production sessions.
    pub fn from_entropy() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::init(seed)
    }

    pub fn rand(&mut self) -> u64 {
        self.next_u64()
    }

    /// Uniform sign: -1.0 or +1.0.
    pub fn pm_one(&mut self) -> f64 {
        if self.next_u64() & 1 == 0 { -1.0 } else { 1.0 }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545F4914F6CDD1D)
    }
}
