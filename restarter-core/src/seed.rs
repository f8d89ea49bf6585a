//! Date-keyed seed derivation for daily content.
//!
//! Every draw is a closed-form function of an integer seed: a fresh ChaCha
//! stream is built per seed and discarded, so no generator state survives
//! between calls.

use chrono::{Datelike, NaiveDate};
use hmac::{Hmac, Mac};
use num_traits::cast::cast;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

/// Day-granularity key, `YYYYMMDD` packed into an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(u32);

impl DateKey {
    /// Build the key for a calendar date. Years before 0 collapse to 0.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let year = u32::try_from(date.year()).unwrap_or(0);
        Self(year * 10_000 + date.month() * 100 + date.day())
    }

    /// Wrap an already packed `YYYYMMDD` value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Unpack into a calendar date, if the packed value names a real day.
    #[must_use]
    pub fn to_date(self) -> Option<NaiveDate> {
        let year = i32::try_from(self.0 / 10_000).ok()?;
        NaiveDate::from_ymd_opt(year, (self.0 / 100) % 100, self.0 % 100)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

/// Domain-separate a date key so parallel content families never share draws.
#[must_use]
pub fn derive_domain_seed(date_key: DateKey, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&u64::from(date_key.value()).to_le_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Seed of one selection slot. Slot 0 is the template, slot `i + 1` the i-th placeholder.
#[must_use]
pub const fn slot_seed(base: u64, offset: u32) -> u64 {
    base.wrapping_add(offset as u64)
}

/// Pseudo-uniform value in `[0, 1)` for the given seed.
#[must_use]
pub fn seeded_unit(seed: u64) -> f64 {
    ChaCha20Rng::seed_from_u64(seed).r#gen::<f64>()
}

/// Scale a unit draw onto `0..len`. Returns `None` for an empty range.
#[must_use]
pub fn scaled_index(unit: f64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len_f = cast::<usize, f64>(len).unwrap_or(0.0);
    let scaled = (unit.clamp(0.0, 1.0) * len_f).floor();
    let idx = cast::<f64, usize>(scaled).unwrap_or(0);
    Some(idx.min(len - 1))
}

/// Pick an index in `0..len` for the seed.
#[must_use]
pub fn seeded_index(seed: u64, len: usize) -> Option<usize> {
    scaled_index(seeded_unit(seed), len)
}
