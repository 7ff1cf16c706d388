//! Deterministic pseudo-random generator behind every game start.
//!
//! This is a fixed linear congruential generator and is part of the
//! wire-observable contract: two servers started with the same seed and fed
//! the same inputs emit byte-identical event logs, so the constants and the
//! return-previous-state behavior must never change.

const MULTIPLIER: u64 = 279_470_273;
const MODULUS: u64 = 4_294_967_291;

#[derive(Debug, Clone)]
pub struct GameRng {
    state: u32,
}

impl GameRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seeds from wall-clock seconds since the epoch, used when no explicit
    /// seed was given on the command line.
    pub fn from_wall_clock() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new(secs as u32)
    }

    /// Returns the current state, then advances it. The multiplication needs
    /// 64-bit arithmetic; the state itself always fits in a `u32`.
    pub fn next_u32(&mut self) -> u32 {
        let previous = u64::from(self.state);
        self.state = ((previous * MULTIPLIER) % MODULUS) as u32;
        previous as u32
    }
}
