//! Fixed-width decimal genes
//!
//! Each coefficient is one gene with this 18 character text form:
//!
//! ```text
//! ±DDDDDD.DDDDDDD±EE
//! │└─int─┘ └frac─┘│└┴ exponent digits
//! sign            exponent sign
//! ```
//!
//! The gene is stored as 17 independent slots (the decimal point is fixed),
//! so crossover and mutation work one character position at a time and any
//! slot combination decodes to a number. Encoding normalizes to a single
//! integer digit, which leaves eight significant digits.

use rand::Rng;
use thiserror::Error;

/// Characters in the text form
pub const GENE_WIDTH: usize = 18;

/// Independently mutable positions (every character except the point)
pub const SLOT_COUNT: usize = 17;

const INT_DIGITS: usize = 6;
const FRAC_DIGITS: usize = 7;
const MANTISSA_DIGITS: usize = INT_DIGITS + FRAC_DIGITS;
const MAX_EXPONENT: i32 = 99;

const POINT_POS: usize = 1 + INT_DIGITS;
const EXP_SIGN_POS: usize = POINT_POS + 1 + FRAC_DIGITS;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneError {
    #[error("gene text must be {GENE_WIDTH} characters, got {0}")]
    Length(usize),

    #[error("gene text has '{found}' at position {position}, expected {expected}")]
    UnexpectedChar {
        position: usize,
        found: char,
        expected: &'static str,
    },

    #[error("{0} cannot be encoded as a gene")]
    Unrepresentable(f64),
}

/// One coefficient in fixed-width decimal form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoefficientGene {
    negative: bool,
    /// Six integer digits followed by seven fraction digits
    mantissa: [u8; MANTISSA_DIGITS],
    exponent_negative: bool,
    exponent: [u8; 2],
}

impl CoefficientGene {
    pub const ZERO: CoefficientGene = CoefficientGene {
        negative: false,
        mantissa: [0; MANTISSA_DIGITS],
        exponent_negative: false,
        exponent: [0; 2],
    };

    /// Encode `value`, keeping eight significant digits.
    ///
    /// Magnitudes below 1e-99 encode as zero.
    pub fn encode(value: f64) -> Result<Self, GeneError> {
        if !value.is_finite() {
            return Err(GeneError::Unrepresentable(value));
        }
        if value == 0.0 {
            return Ok(Self::ZERO);
        }

        let magnitude = value.abs();
        let mut exponent = magnitude.log10().floor() as i32;
        let mut scaled = (magnitude / 10f64.powi(exponent) * 1e7).round() as u64;
        // log10 can land one off near powers of ten
        if scaled >= 100_000_000 {
            exponent += 1;
            scaled = (magnitude / 10f64.powi(exponent) * 1e7).round() as u64;
        } else if scaled < 10_000_000 {
            exponent -= 1;
            scaled = (magnitude / 10f64.powi(exponent) * 1e7).round() as u64;
        }
        if scaled >= 100_000_000 {
            exponent += 1;
            scaled /= 10;
        }

        if exponent > MAX_EXPONENT {
            return Err(GeneError::Unrepresentable(value));
        }
        if exponent < -MAX_EXPONENT {
            return Ok(Self::ZERO);
        }

        let mut mantissa = [0u8; MANTISSA_DIGITS];
        let mut rest = scaled;
        for slot in mantissa.iter_mut().rev().take(FRAC_DIGITS + 1) {
            *slot = (rest % 10) as u8;
            rest /= 10;
        }

        let e = exponent.unsigned_abs();
        Ok(Self {
            negative: value < 0.0,
            mantissa,
            exponent_negative: exponent < 0,
            exponent: [(e / 10) as u8, (e % 10) as u8],
        })
    }

    pub fn decode(&self) -> f64 {
        let digits = self
            .mantissa
            .iter()
            .fold(0u64, |acc, &d| acc * 10 + d as u64);
        let exponent = (self.exponent[0] as i32 * 10 + self.exponent[1] as i32)
            * if self.exponent_negative { -1 } else { 1 };

        let magnitude = digits as f64 / 1e7 * 10f64.powi(exponent);
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Random gene whose integer part is a single digit and whose exponent
    /// magnitude is at most `max_exponent`
    pub fn random(rng: &mut impl Rng, max_exponent: u8) -> Self {
        let mut mantissa = [0u8; MANTISSA_DIGITS];
        for slot in mantissa.iter_mut().skip(INT_DIGITS - 1) {
            *slot = rng.random_range(0..10);
        }
        let e = rng.random_range(0..=max_exponent.min(MAX_EXPONENT as u8));
        Self {
            negative: rng.random_bool(0.5),
            mantissa,
            exponent_negative: rng.random_bool(0.5),
            exponent: [e / 10, e % 10],
        }
    }

    /// Child taking each slot from `self` or `other` with equal odds
    pub fn crossover(&self, other: &Self, rng: &mut impl Rng) -> Self {
        let mut child = *self;
        for slot in 0..SLOT_COUNT {
            if rng.random_bool(0.5) {
                child.set_slot(slot, other.slot(slot));
            }
        }
        child
    }

    /// Replace one random slot with a random valid value
    pub fn mutate(&mut self, rng: &mut impl Rng) {
        let slot = rng.random_range(0..SLOT_COUNT);
        let value = if Self::is_sign_slot(slot) {
            rng.random_range(0..2)
        } else {
            rng.random_range(0..10)
        };
        self.set_slot(slot, value);
    }

    fn is_sign_slot(slot: usize) -> bool {
        slot == 0 || slot == 1 + MANTISSA_DIGITS
    }

    /// Slot layout: sign, 13 mantissa digits, exponent sign, 2 exponent digits
    fn slot(&self, slot: usize) -> u8 {
        match slot {
            0 => self.negative as u8,
            s if s <= MANTISSA_DIGITS => self.mantissa[s - 1],
            s if s == MANTISSA_DIGITS + 1 => self.exponent_negative as u8,
            s => self.exponent[s - MANTISSA_DIGITS - 2],
        }
    }

    fn set_slot(&mut self, slot: usize, value: u8) {
        match slot {
            0 => self.negative = value != 0,
            s if s <= MANTISSA_DIGITS => self.mantissa[s - 1] = value,
            s if s == MANTISSA_DIGITS + 1 => self.exponent_negative = value != 0,
            s => self.exponent[s - MANTISSA_DIGITS - 2] = value,
        }
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Parse the 18 character text form
    pub fn from_text(text: &str) -> Result<Self, GeneError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() != GENE_WIDTH {
            return Err(GeneError::Length(chars.len()));
        }

        let sign = |position: usize| match chars[position] {
            '+' => Ok(false),
            '-' => Ok(true),
            found => Err(GeneError::UnexpectedChar {
                position,
                found,
                expected: "'+' or '-'",
            }),
        };
        let digit = |position: usize| {
            chars[position]
                .to_digit(10)
                .map(|d| d as u8)
                .ok_or(GeneError::UnexpectedChar {
                    position,
                    found: chars[position],
                    expected: "a digit",
                })
        };

        if chars[POINT_POS] != '.' {
            return Err(GeneError::UnexpectedChar {
                position: POINT_POS,
                found: chars[POINT_POS],
                expected: "'.'",
            });
        }

        let mut mantissa = [0u8; MANTISSA_DIGITS];
        for (i, slot) in mantissa.iter_mut().enumerate() {
            let position = if i < INT_DIGITS { 1 + i } else { 2 + i };
            *slot = digit(position)?;
        }

        Ok(Self {
            negative: sign(0)?,
            mantissa,
            exponent_negative: sign(EXP_SIGN_POS)?,
            exponent: [digit(EXP_SIGN_POS + 1)?, digit(EXP_SIGN_POS + 2)?],
        })
    }
}

impl std::fmt::Display for CoefficientGene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = |negative: bool| if negative { '-' } else { '+' };
        let digits = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();

        write!(
            f,
            "{}{}.{}{}{}",
            sign(self.negative),
            digits(&self.mantissa[..INT_DIGITS]),
            digits(&self.mantissa[INT_DIGITS..]),
            sign(self.exponent_negative),
            digits(&self.exponent)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn differing_slots(a: &CoefficientGene, b: &CoefficientGene) -> usize {
        (0..SLOT_COUNT).filter(|&s| a.slot(s) != b.slot(s)).count()
    }

    #[test]
    fn test_text_layout() {
        let gene = CoefficientGene::encode(-1.5e-3).unwrap();
        assert_eq!(gene.to_text(), "-000001.5000000-03");
        assert_eq!(gene.to_text().len(), GENE_WIDTH);

        assert_eq!(CoefficientGene::ZERO.to_text(), "+000000.0000000+00");
    }

    #[test]
    fn test_encode_decode_precision() {
        let values = [
            1234.5678,
            -0.000123456789,
            6.02214076e23,
            1e-7,
            -999_999.999,
            45.0,
            0.1,
            9.999999999,
        ];
        for value in values {
            let decoded = CoefficientGene::encode(value).unwrap().decode();
            let rel = ((decoded - value) / value).abs();
            assert!(rel < 1e-7, "{value} decoded as {decoded}");
        }
        assert_eq!(CoefficientGene::encode(0.0).unwrap().decode(), 0.0);
    }

    #[test]
    fn test_text_round_trip() {
        let gene = CoefficientGene::encode(-42.125).unwrap();
        let parsed = CoefficientGene::from_text(&gene.to_text()).unwrap();
        assert_eq!(parsed, gene);
    }

    #[test]
    fn test_unnormalized_text_decodes() {
        let gene = CoefficientGene::from_text("+004512.0000000+03").unwrap();
        assert!((gene.decode() - 4.512e6).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_text_fails() {
        assert_eq!(
            CoefficientGene::from_text("+1.0"),
            Err(GeneError::Length(4))
        );
        assert!(matches!(
            CoefficientGene::from_text("+000001,5000000-03"),
            Err(GeneError::UnexpectedChar { position: 7, .. })
        ));
        assert!(matches!(
            CoefficientGene::from_text("*000001.5000000-03"),
            Err(GeneError::UnexpectedChar { position: 0, .. })
        ));
        assert!(matches!(
            CoefficientGene::from_text("+000001.50x0000-03"),
            Err(GeneError::UnexpectedChar { position: 10, .. })
        ));
        assert!(matches!(
            CoefficientGene::from_text("+000001.5000000E03"),
            Err(GeneError::UnexpectedChar { position: 15, .. })
        ));
    }

    #[test]
    fn test_unrepresentable() {
        assert!(CoefficientGene::encode(f64::NAN).is_err());
        assert!(CoefficientGene::encode(f64::INFINITY).is_err());
        assert!(CoefficientGene::encode(1e120).is_err());
        assert_eq!(CoefficientGene::encode(1e-120).unwrap(), CoefficientGene::ZERO);
    }

    #[test]
    fn test_crossover_takes_parent_slots() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = CoefficientGene::encode(123.456).unwrap();
        let b = CoefficientGene::encode(-0.0987654).unwrap();
        for _ in 0..20 {
            let child = a.crossover(&b, &mut rng);
            for s in 0..SLOT_COUNT {
                assert!(child.slot(s) == a.slot(s) || child.slot(s) == b.slot(s));
            }
        }
        assert_eq!(a.crossover(&a, &mut rng), a);
    }

    #[test]
    fn test_mutation_touches_one_slot() {
        let mut rng = StdRng::seed_from_u64(11);
        let original = CoefficientGene::encode(3.14159).unwrap();
        for _ in 0..50 {
            let mut gene = original;
            gene.mutate(&mut rng);
            assert!(differing_slots(&original, &gene) <= 1);
            // Still a valid text form
            assert!(CoefficientGene::from_text(&gene.to_text()).is_ok());
        }
    }

    #[test]
    fn test_random_respects_exponent_limit() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let gene = CoefficientGene::random(&mut rng, 3);
            let magnitude = gene.decode().abs();
            assert!(magnitude < 1e4);
            assert!(gene.mantissa[..INT_DIGITS - 1].iter().all(|&d| d == 0));
        }
    }
}
