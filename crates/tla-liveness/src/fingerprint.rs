//! State fingerprints
//!
//! A [`Fingerprint`] is the fixed-width identity of a state. The liveness
//! engine never looks inside states; product nodes are keyed by fingerprint
//! and the evaluator is trusted to hand out collision-free values.
//!
//! Evaluators that need a hash can use the FP64 polynomial rolling hash below
//! (a Rabin fingerprint over GF(2^64)), the same scheme TLC uses. It extends
//! one byte at a time, so composite values are fingerprinted by extending with
//! a type tag and then each component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A 64-bit state fingerprint
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint a sequence of integers (e.g. the variables of a state).
    pub fn of_ints(values: &[i64]) -> Self {
        let mut fp = fp64_extend_i64(FP64_INIT, tags::INT_TUPLE);
        fp = fp64_extend_i64(fp, values.len() as i64);
        for &v in values {
            fp = fp64_extend_i64(fp, v);
        }
        Fingerprint(fp)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FP({:016x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Irreducible polynomial used as the initial fingerprint value.
pub const FP64_INIT: u64 = 0x911498AE0E66BAD6;

const ONE: u64 = 0x8000000000000000;
const X63: u64 = 0x1;

/// Precomputed byte mod table, built once on first use.
static BYTE_MOD_TABLE: OnceLock<[u64; 256]> = OnceLock::new();

#[inline]
fn byte_mod_table() -> &'static [u64; 256] {
    BYTE_MOD_TABLE.get_or_init(|| compute_byte_mod_table(FP64_INIT))
}

fn compute_byte_mod_table(irred_poly: u64) -> [u64; 256] {
    // Highest power needed is 127 - 7*8 = 71
    const PLENGTH: usize = 72;
    let mut power_table = [0u64; PLENGTH];

    // power_table[i] = x^i mod irred_poly
    let mut t = ONE;
    for entry in power_table.iter_mut() {
        *entry = t;
        let mask = if (t & X63) != 0 { irred_poly } else { 0 };
        t = (t >> 1) ^ mask;
    }

    let mut table = [0u64; 256];
    for (j, entry) in table.iter_mut().enumerate() {
        let mut v = 0u64;
        for k in 0..=7 {
            if (j & (1usize << k)) != 0 {
                v ^= power_table[127 - 7 * 8 - k];
            }
        }
        *entry = v;
    }
    table
}

/// Extend a fingerprint by one byte.
#[inline]
pub fn fp64_extend_byte(fp: u64, b: u8) -> u64 {
    let table = byte_mod_table();
    let idx = ((b as u64) ^ fp) as usize & 0xFF;
    (fp >> 8) ^ table[idx]
}

/// Extend a fingerprint by an i64 (8 bytes, little-endian).
#[inline]
pub fn fp64_extend_i64(mut fp: u64, x: i64) -> u64 {
    for b in x.to_le_bytes() {
        fp = fp64_extend_byte(fp, b);
    }
    fp
}

/// Type tags extended into a fingerprint before the value's contents, so that
/// values of different shapes with equal contents hash apart.
pub mod tags {
    pub const INT_TUPLE: i64 = 7;
}
