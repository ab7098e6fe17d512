//! Deterministic content fingerprint of a fit's inputs.
//!
//! `DefaultHasher` is randomly seeded per process, so identical point sets
//! would hash differently across runs. FNV-1a over the raw bit patterns gives
//! a value that can be stored and compared later.

use std::hash::Hasher;

use crate::gcp::GroundControlPoint;
use crate::polynomial::Order;

/// FNV-1a 64-bit hasher with fixed seed.
#[derive(Debug)]
pub struct FnvHasher(u64);

impl FnvHasher {
    pub fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

/// Fingerprint of `(order, gcps)` as 16 lowercase hex digits.
///
/// `gcps` are expected in canonical order.
pub fn fingerprint(order: Order, gcps: &[GroundControlPoint]) -> String {
    let mut hasher = FnvHasher::new();
    hasher.write_u8(order.get());
    hasher.write(&(gcps.len() as u64).to_le_bytes());
    for p in gcps {
        for value in [p.pixel_x, p.pixel_y, p.lon, p.lat] {
            hasher.write(&value.to_bits().to_le_bytes());
        }
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_reference_vector() {
        let mut hasher = FnvHasher::new();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_fingerprint_depends_on_order_and_points() {
        let gcps = [
            GroundControlPoint::new(0.0, 0.0, 1.0, 2.0),
            GroundControlPoint::new(10.0, 0.0, 1.5, 2.0),
        ];
        let one = fingerprint(Order::MIN, &gcps);
        assert_eq!(one.len(), 16);
        assert_eq!(one, fingerprint(Order::MIN, &gcps));
        assert_ne!(one, fingerprint(Order::MAX, &gcps));
        assert_ne!(one, fingerprint(Order::MIN, &gcps[..1]));
    }
}
