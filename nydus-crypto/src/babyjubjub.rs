//! Baby Jubjub twisted Edwards curve over the BN254 scalar field.
//!
//! # Curve Equation
//!
//! ```text
//! a * x^2 + y^2 = 1 + d * x^2 * y^2     a = 168700, d = 168696
//! ```
//!
//! The group has order `8 * l` where `l` is a 251-bit prime. Keys live in the
//! prime-order subgroup generated by `Base8 = 8 * G` (EIP-2494); the companion
//! circuit hardcodes Base8, so its coordinates are published verbatim below and
//! never recomputed at runtime.
//!
//! Arithmetic runs in extended coordinates `(X : Y : Z : T)` with `T = XY/Z`
//! using the complete hwcd-2008 formulas, so there are no exceptional cases for
//! points on the curve. Scalar multiplication is a plain double-and-add ladder
//! and is not constant time.

use std::fmt;

use halo2curves_axiom::{bn256::Fr, ff::Field};
use serde::{Deserialize, Serialize};

use crate::{Error, FieldElement, Result};

/// Curve parameter `a`.
pub const CURVE_A: u64 = 168700;

/// Curve parameter `d`.
pub const CURVE_D: u64 = 168696;

/// Cofactor of the full curve group.
pub const COFACTOR: u64 = 8;

/// Order `l` of the prime subgroup generated by Base8.
pub const SUBGROUP_ORDER: &str =
    "2736030358979909402780800718157159386076813972158567259200215660948447373041";

/// x-coordinate of the curve generator G.
pub const GENERATOR_X: &str =
    "995203441582195749578291179787384436505546430278305826713579947235728471134";

/// y-coordinate of the curve generator G.
pub const GENERATOR_Y: &str =
    "5472060717959818805561601436314318772137091100104008585924551046643952123905";

/// x-coordinate of Base8 = 8 * G, the base point of every public key.
pub const BASE8_X: &str =
    "5299619240641551281634865583518297030282874472190772894086521144482721001553";

/// y-coordinate of Base8 = 8 * G, the base point of every public key.
pub const BASE8_Y: &str =
    "16950150798460657717958625567821834550301663161624707787222815936182638968203";

// Limb forms of the published constants above (little-endian u64 words).
const SUBGROUP_ORDER_LIMBS: [u64; 4] = [
    0x677297dc392126f1,
    0xab3eedb83920ee0a,
    0x370a08b6d0302b0b,
    0x060c89ce5c263405,
];
const GENERATOR_X_LIMBS: [u64; 4] = [
    0x40f41a59f4d4b45e,
    0xb494b1255b1162bb,
    0x38bcba38f25645ad,
    0x023343e3445b673d,
];
const GENERATOR_Y_LIMBS: [u64; 4] = [
    0x50f87d64fc000001,
    0x4a0cfa121e6e5c24,
    0x6e14116da0605617,
    0x0c19139cb84c680a,
];
const BASE8_X_LIMBS: [u64; 4] = [
    0x2893f3f6bb957051,
    0x2ab8d8010534e0b6,
    0x4eacb2e09d6277c1,
    0x0bb77a6ad63e739b,
];
const BASE8_Y_LIMBS: [u64; 4] = [
    0x4b3c257a872d7d8b,
    0xfce0051fb9e13377,
    0x25572e1cd16bf9ed,
    0x25797203f7a0b249,
];

/// The prime subgroup order `l` as a field element.
pub fn subgroup_order() -> FieldElement {
    Fr::from_raw(SUBGROUP_ORDER_LIMBS).into()
}

fn curve_a() -> Fr {
    Fr::from(CURVE_A)
}

fn curve_d() -> Fr {
    Fr::from(CURVE_D)
}

/// An affine point that is known to satisfy the curve equation.
///
/// The only ways to obtain one are the validating constructors and the group
/// operations, so arithmetic code never sees an off-curve point.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AffineCoordinates", into = "AffineCoordinates")]
pub struct CurvePoint {
    x: FieldElement,
    y: FieldElement,
}

/// Unvalidated wire form of a point.
#[derive(Clone, Copy, Serialize, Deserialize)]
struct AffineCoordinates {
    x: FieldElement,
    y: FieldElement,
}

impl CurvePoint {
    /// Validate coordinates against the curve equation.
    pub fn new(x: FieldElement, y: FieldElement) -> Result<Self> {
        if !Self::satisfies_equation(x.inner(), y.inner()) {
            return Err(Error::InvalidPoint(format!(
                "({x}, {y}) does not satisfy the Baby Jubjub equation"
            )));
        }
        Ok(Self { x, y })
    }

    /// Parse and validate hex coordinates.
    pub fn from_hex(x: &str, y: &str) -> Result<Self> {
        Self::new(FieldElement::from_hex(x)?, FieldElement::from_hex(y)?)
    }

    /// The neutral element `(0, 1)`.
    pub fn identity() -> Self {
        Self {
            x: FieldElement::ZERO,
            y: FieldElement::ONE,
        }
    }

    /// The curve generator G (order `8 * l`).
    pub fn generator() -> Self {
        Self::from_limbs(GENERATOR_X_LIMBS, GENERATOR_Y_LIMBS)
    }

    /// Base8 = 8 * G, the circuit's public-key base point.
    pub fn base8() -> Self {
        Self::from_limbs(BASE8_X_LIMBS, BASE8_Y_LIMBS)
    }

    fn from_limbs(x: [u64; 4], y: [u64; 4]) -> Self {
        Self {
            x: Fr::from_raw(x).into(),
            y: Fr::from_raw(y).into(),
        }
    }

    pub fn x(&self) -> FieldElement {
        self.x
    }

    pub fn y(&self) -> FieldElement {
        self.y
    }

    pub fn is_identity(&self) -> bool {
        self.x.is_zero() && self.y == FieldElement::ONE
    }

    /// Check `a*x^2 + y^2 == 1 + d*x^2*y^2`.
    pub fn is_on_curve(x: FieldElement, y: FieldElement) -> bool {
        Self::satisfies_equation(x.inner(), y.inner())
    }

    fn satisfies_equation(x: Fr, y: Fr) -> bool {
        let x2 = x.square();
        let y2 = y.square();
        let lhs = curve_a() * x2 + y2;
        let rhs = Fr::ONE + curve_d() * x2 * y2;
        lhs == rhs
    }

    pub fn neg(&self) -> Self {
        Self {
            x: -self.x,
            y: self.y,
        }
    }

    pub fn add(&self, other: &CurvePoint) -> Self {
        ExtendedPoint::from_affine(self)
            .add(&ExtendedPoint::from_affine(other))
            .to_affine()
    }

    pub fn double(&self) -> Self {
        ExtendedPoint::from_affine(self).double().to_affine()
    }

    /// Multiply by an integer scalar in `[0, M)`.
    pub fn mul(&self, scalar: &FieldElement) -> Self {
        self.mul_le_bytes(&scalar.to_le_bytes())
    }

    /// Multiply by a 256-bit little-endian integer.
    pub(crate) fn mul_le_bytes(&self, scalar: &[u8; 32]) -> Self {
        ExtendedPoint::from_affine(self)
            .mul_le_bytes(scalar)
            .to_affine()
    }

    /// True when `l * P` is the identity, i.e. the point lies in the
    /// subgroup generated by Base8.
    pub fn is_in_prime_subgroup(&self) -> bool {
        self.mul(&subgroup_order()).is_identity()
    }
}

impl fmt::Debug for CurvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurvePoint")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl TryFrom<AffineCoordinates> for CurvePoint {
    type Error = Error;

    fn try_from(raw: AffineCoordinates) -> Result<Self> {
        Self::new(raw.x, raw.y)
    }
}

impl From<CurvePoint> for AffineCoordinates {
    fn from(point: CurvePoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

/// Extended twisted Edwards coordinates, internal to the ladder.
#[derive(Clone, Copy, Debug)]
struct ExtendedPoint {
    x: Fr,
    y: Fr,
    z: Fr,
    t: Fr,
}

impl ExtendedPoint {
    fn identity() -> Self {
        Self {
            x: Fr::ZERO,
            y: Fr::ONE,
            z: Fr::ONE,
            t: Fr::ZERO,
        }
    }

    fn from_affine(point: &CurvePoint) -> Self {
        let x = point.x.inner();
        let y = point.y.inner();
        Self {
            x,
            y,
            z: Fr::ONE,
            t: x * y,
        }
    }

    fn to_affine(&self) -> CurvePoint {
        // Z stays non-zero: the addition law is complete on this curve.
        let z_inv = self.z.invert().unwrap_or(Fr::ZERO);
        CurvePoint {
            x: (self.x * z_inv).into(),
            y: (self.y * z_inv).into(),
        }
    }

    /// add-2008-hwcd
    fn add(&self, other: &ExtendedPoint) -> Self {
        let a = self.x * other.x;
        let b = self.y * other.y;
        let c = curve_d() * self.t * other.t;
        let d = self.z * other.z;
        let e = (self.x + self.y) * (other.x + other.y) - a - b;
        let f = d - c;
        let g = d + c;
        let h = b - curve_a() * a;
        Self {
            x: e * f,
            y: g * h,
            z: f * g,
            t: e * h,
        }
    }

    /// dbl-2008-hwcd
    fn double(&self) -> Self {
        let a = self.x.square();
        let b = self.y.square();
        let c = self.z.square().double();
        let d = curve_a() * a;
        let e = (self.x + self.y).square() - a - b;
        let g = d + b;
        let f = g - c;
        let h = d - b;
        Self {
            x: e * f,
            y: g * h,
            z: f * g,
            t: e * h,
        }
    }

    fn mul_le_bytes(&self, scalar: &[u8; 32]) -> Self {
        let mut acc = Self::identity();
        for byte in scalar.iter().rev() {
            for bit in (0..8u32).rev() {
                acc = acc.double();
                if (*byte >> bit) & 1 == 1 {
                    acc = acc.add(self);
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> FieldElement {
        FieldElement::from_dec_str(text).unwrap()
    }

    #[test]
    fn published_constants_match_limbs() {
        let base8 = CurvePoint::base8();
        assert_eq!(base8.x(), dec(BASE8_X));
        assert_eq!(base8.y(), dec(BASE8_Y));

        let generator = CurvePoint::generator();
        assert_eq!(generator.x(), dec(GENERATOR_X));
        assert_eq!(generator.y(), dec(GENERATOR_Y));

        assert_eq!(subgroup_order(), dec(SUBGROUP_ORDER));
    }

    #[test]
    fn base_points_are_on_curve() {
        for point in [CurvePoint::identity(), CurvePoint::generator(), CurvePoint::base8()] {
            assert!(CurvePoint::is_on_curve(point.x(), point.y()));
        }
    }

    #[test]
    fn base8_is_eight_times_generator() {
        let eight = FieldElement::from_u64(COFACTOR);
        assert_eq!(CurvePoint::generator().mul(&eight), CurvePoint::base8());
    }

    #[test]
    fn base8_has_prime_order() {
        assert!(CurvePoint::base8().is_in_prime_subgroup());
        assert!(!CurvePoint::generator().is_in_prime_subgroup());
    }

    #[test]
    fn doubling_matches_addition() {
        let base = CurvePoint::base8();
        let doubled = base.double();
        assert_eq!(doubled, base.add(&base));
        assert_eq!(
            doubled,
            CurvePoint::from_hex(
                "0x162d7e417903fa1c82f2d227e35b846b1133cfca4f558b5feb9fdcd5f81dd902",
                "0x01666cafbf0a30da8b9ebeaf848a1da067a892296f1043188e1705402b6d6853",
            )
            .unwrap()
        );
    }

    #[test]
    fn identity_is_neutral() {
        let base = CurvePoint::base8();
        assert_eq!(base.add(&CurvePoint::identity()), base);
        assert!(base.add(&base.neg()).is_identity());
        assert!(base.mul(&FieldElement::ZERO).is_identity());
        assert_eq!(base.mul(&FieldElement::ONE), base);
    }

    #[test]
    fn scalar_multiplication_distributes() {
        let base = CurvePoint::base8();
        let a = FieldElement::from_u64(12345);
        let b = FieldElement::from_u64(67890);
        assert_eq!(base.mul(&a).add(&base.mul(&b)), base.mul(&(a + b)));
        assert_eq!(base.mul(&a).mul(&b), base.mul(&b).mul(&a));
    }

    #[test]
    fn rejects_off_curve_point() {
        let err = CurvePoint::new(FieldElement::from_u64(1), FieldElement::from_u64(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidPoint(_)));
    }

    #[test]
    fn order_two_point_is_outside_subgroup() {
        let point = CurvePoint::new(FieldElement::ZERO, -FieldElement::ONE).unwrap();
        assert!(point.double().is_identity());
        assert!(!point.is_in_prime_subgroup());
    }

    #[test]
    fn serde_round_trip_validates() {
        let base = CurvePoint::base8();
        let json = serde_json::to_string(&base).unwrap();
        let decoded: CurvePoint = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, base);

        let bogus = r#"{"x":"0x01","y":"0x02"}"#;
        assert!(serde_json::from_str::<CurvePoint>(bogus).is_err());
    }
}
