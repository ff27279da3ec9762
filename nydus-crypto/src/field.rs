//! BN254 scalar field elements.
//!
//! Every value handed across the crate boundary is a [`FieldElement`]: a
//! canonically reduced integer in `[0, M)` where `M` is the BN254 scalar field
//! order (the native field of the companion circuit).
//!
//! ```text
//! M = 21888242871839275222246405745257275088548364400416034343698204186575808495617
//!   = 0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001
//! ```
//!
//! Arithmetic is delegated to `halo2curves_axiom::bn256::Fr`. The wrapper only
//! adds range-checked constructors and the wire encoding: a `0x`-prefixed,
//! 64-nibble, big-endian hex string.

use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use halo2curves_axiom::{
    bn256::Fr,
    ff::{Field, PrimeField},
};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Field modulus `M` in decimal.
pub const FIELD_MODULUS_DEC: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Field modulus `M` in hex.
pub const FIELD_MODULUS_HEX: &str =
    "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

/// Byte width of an encoded field element.
pub const FIELD_BYTES: usize = 32;

static MODULUS: Lazy<BigUint> = Lazy::new(|| fr_to_biguint(&-Fr::ONE) + 1u32);

/// The field modulus as a big integer.
pub fn modulus() -> &'static BigUint {
    &MODULUS
}

/// A canonically reduced element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldElement(Fr);

impl FieldElement {
    pub const ZERO: Self = Self(Fr::ZERO);
    pub const ONE: Self = Self(Fr::ONE);

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// Decode a big-endian 32-byte integer. Values `>= M` are rejected.
    pub fn from_be_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Self> {
        let mut repr = <Fr as PrimeField>::Repr::default();
        for (dst, src) in repr.as_mut().iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
        Option::<Fr>::from(Fr::from_repr(repr))
            .map(Self)
            .ok_or_else(|| {
                Error::OutOfRange(format!("0x{} is not below the field modulus", hex::encode(bytes)))
            })
    }

    /// Encode as a big-endian 32-byte integer.
    pub fn to_be_bytes(&self) -> [u8; FIELD_BYTES] {
        let repr = self.0.to_repr();
        let mut bytes = [0u8; FIELD_BYTES];
        bytes.copy_from_slice(repr.as_ref());
        bytes.reverse();
        bytes
    }

    /// Little-endian canonical bytes, as used for scalar bit iteration.
    pub(crate) fn to_le_bytes(&self) -> [u8; FIELD_BYTES] {
        let repr = self.0.to_repr();
        let mut bytes = [0u8; FIELD_BYTES];
        bytes.copy_from_slice(repr.as_ref());
        bytes
    }

    pub fn from_biguint(value: &BigUint) -> Result<Self> {
        if value >= modulus() {
            return Err(Error::OutOfRange(format!(
                "{value:#x} is not below the field modulus"
            )));
        }
        let le = value.to_bytes_le();
        let mut bytes = [0u8; FIELD_BYTES];
        for (i, byte) in le.iter().enumerate() {
            bytes[FIELD_BYTES - 1 - i] = *byte;
        }
        Self::from_be_bytes(&bytes)
    }

    pub fn to_biguint(&self) -> BigUint {
        fr_to_biguint(&self.0)
    }

    /// Parse a hex string of any width, with or without a `0x` prefix.
    ///
    /// Leading zeros are allowed; the numeric value must be below `M`.
    pub fn from_hex(text: &str) -> Result<Self> {
        reject_negative(text)?;
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() {
            return Err(Error::Encoding(format!("empty hex string {text:?}")));
        }
        let value = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| Error::Encoding(format!("invalid hex string {text:?}")))?;
        Self::from_biguint(&value)
    }

    /// Fixed-width `0x`-prefixed big-endian hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    pub fn from_dec_str(text: &str) -> Result<Self> {
        reject_negative(text)?;
        let value = BigUint::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| Error::Encoding(format!("invalid decimal string {text:?}")))?;
        Self::from_biguint(&value)
    }

    pub fn is_zero(&self) -> bool {
        bool::from(self.0.is_zero())
    }

    pub(crate) fn inner(&self) -> Fr {
        self.0
    }
}

impl From<Fr> for FieldElement {
    fn from(fr: Fr) -> Self {
        Self(fr)
    }
}

impl From<FieldElement> for Fr {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<FieldElement> for String {
    fn from(value: FieldElement) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for FieldElement {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        text.parse()
    }
}

/// Accepts `0x`-prefixed hex or plain decimal.
impl FromStr for FieldElement {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        reject_negative(text)?;
        if text.starts_with("0x") || text.starts_with("0X") {
            Self::from_hex(text)
        } else {
            Self::from_dec_str(text)
        }
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

fn reject_negative(text: &str) -> Result<()> {
    if text.starts_with('-') {
        return Err(Error::OutOfRange(format!("{text:?} is negative")));
    }
    Ok(())
}

fn fr_to_biguint(fr: &Fr) -> BigUint {
    BigUint::from_bytes_le(fr.to_repr().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_element() -> FieldElement {
        FieldElement::from_biguint(&(modulus() - 1u32)).unwrap()
    }

    #[test]
    fn modulus_matches_published_constants() {
        assert_eq!(modulus().to_str_radix(10), FIELD_MODULUS_DEC);
        assert_eq!(format!("{:#x}", modulus()), FIELD_MODULUS_HEX);
    }

    #[test]
    fn hex_is_fixed_width() {
        let one = FieldElement::ONE;
        assert_eq!(
            one.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(FieldElement::ZERO.to_hex().len(), 66);
    }

    #[test]
    fn from_hex_accepts_short_and_unprefixed_input() {
        assert_eq!(FieldElement::from_hex("0x64").unwrap(), FieldElement::from_u64(100));
        assert_eq!(FieldElement::from_hex("64").unwrap(), FieldElement::from_u64(100));
        assert_eq!(FieldElement::from_hex("0X0064").unwrap(), FieldElement::from_u64(100));
        assert_eq!(FieldElement::from_hex("0x00").unwrap(), FieldElement::ZERO);
    }

    #[test]
    fn from_hex_rejects_modulus() {
        let err = FieldElement::from_hex(FIELD_MODULUS_HEX).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(FieldElement::from_hex("0x"), Err(Error::Encoding(_))));
        assert!(matches!(FieldElement::from_hex("0xzz"), Err(Error::Encoding(_))));
    }

    #[test]
    fn modulus_minus_one_is_valid() {
        let max = max_element();
        assert_eq!(max + FieldElement::ONE, FieldElement::ZERO);
        assert_eq!(max, -FieldElement::ONE);
    }

    #[test]
    fn be_bytes_round_trip() {
        let value = FieldElement::from_hex("0x58002bee8f43bf203964d38c54fa03e62d615959fa").unwrap();
        let bytes = value.to_be_bytes();
        assert_eq!(bytes[31], 0xfa);
        assert_eq!(FieldElement::from_be_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn be_bytes_rejects_non_canonical() {
        let mut bytes = [0xffu8; 32];
        assert!(FieldElement::from_be_bytes(&bytes).is_err());
        bytes[0] = 0x30;
        assert!(FieldElement::from_be_bytes(&bytes).is_err());
    }

    #[test]
    fn subtraction_wraps_into_field() {
        let a = FieldElement::from_u64(3);
        let b = FieldElement::from_u64(5);
        assert_eq!(a - b, -FieldElement::from_u64(2));
        assert_eq!((a - b).to_biguint(), modulus() - 2u32);
    }

    #[test]
    fn parses_decimal_and_hex() {
        let dec: FieldElement = "255".parse().unwrap();
        let hex: FieldElement = "0xff".parse().unwrap();
        assert_eq!(dec, hex);
        assert!(matches!(
            FIELD_MODULUS_DEC.parse::<FieldElement>(),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!("12ab".parse::<FieldElement>(), Err(Error::Encoding(_))));
    }

    #[test]
    fn negative_input_is_out_of_range() {
        for text in ["-1", "-0x5", " -7 ", "-0"] {
            assert!(
                matches!(text.parse::<FieldElement>(), Err(Error::OutOfRange(_))),
                "{text}"
            );
        }
        assert!(matches!(FieldElement::from_dec_str("-1"), Err(Error::OutOfRange(_))));
        assert!(matches!(FieldElement::from_hex("-0x5"), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let value = FieldElement::from_u64(0x64);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            "\"0x0000000000000000000000000000000000000000000000000000000000000064\""
        );
        let decoded: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, value);

        let too_big = format!("\"{FIELD_MODULUS_HEX}\"");
        assert!(serde_json::from_str::<FieldElement>(&too_big).is_err());
    }
}
