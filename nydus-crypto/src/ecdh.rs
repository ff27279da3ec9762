//! Diffie-Hellman key agreement on Baby Jubjub.
//!
//! Public keys are `s * Base8`. Two parties holding `(a, A)` and `(b, B)`
//! both arrive at the shared point `a * B = b * A`, which is compressed to a
//! single field element with `Hash2(x, y)`. That element is the shared key fed
//! to the counter-mode cipher in [`crate::ctr`].

use std::{fmt, str::FromStr};

use halo2curves_axiom::{bn256::Fr, ff::Field};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    babyjubjub::CurvePoint,
    field::FIELD_BYTES,
    poseidon2::hash2,
    Error, FieldElement, Result,
};

/// A secret scalar in `[1, M)` that is not a multiple of the subgroup order.
///
/// The canonical little-endian bytes are wiped on drop. The type has no serde
/// impls and its `Debug` output is redacted, so it cannot leak through logs
/// or wire formats by accident.
///
/// Only the stored bytes are wiped. The `Copy` `FieldElement`/`Fr` values and
/// the heap buffers used while parsing text are not zeroized, and scalar
/// multiplication is not constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateScalar {
    le_bytes: [u8; FIELD_BYTES],
}

impl PrivateScalar {
    /// Wrap a field element, rejecting every multiple of the subgroup order
    /// `l` (zero included).
    ///
    /// Such a scalar maps Base8 to the identity, giving a public key no peer
    /// accepts and a shared key of `Hash2(0, 1)` for every counterparty.
    pub fn from_field(value: FieldElement) -> Result<Self> {
        if value.is_zero() {
            return Err(Error::OutOfRange(
                "private scalar must be non-zero".into(),
            ));
        }
        let mut le_bytes = value.to_le_bytes();
        let scalar = Self { le_bytes };
        le_bytes.zeroize();
        // Base8 has prime order l, so s * Base8 = O exactly when l divides s.
        if CurvePoint::base8().mul_le_bytes(scalar.le_bytes()).is_identity() {
            return Err(Error::OutOfRange(
                "private scalar must not be a multiple of the subgroup order".into(),
            ));
        }
        Ok(scalar)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        Self::from_field(FieldElement::from_hex(text)?)
    }

    pub fn from_be_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Self> {
        Self::from_field(FieldElement::from_be_bytes(bytes)?)
    }

    /// Sample a uniformly random non-zero scalar.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let candidate = FieldElement::from(Fr::random(&mut *rng));
            if let Ok(scalar) = Self::from_field(candidate) {
                return scalar;
            }
        }
    }

    pub(crate) fn le_bytes(&self) -> &[u8; FIELD_BYTES] {
        &self.le_bytes
    }
}

impl fmt::Debug for PrivateScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateScalar(<redacted>)")
    }
}

/// Accepts `0x`-prefixed hex or plain decimal.
impl FromStr for PrivateScalar {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::from_field(text.parse()?)
    }
}

/// A private scalar together with its public point.
#[derive(Clone)]
pub struct KeyPair {
    private_key: PrivateScalar,
    public_key: CurvePoint,
}

impl KeyPair {
    pub fn from_private_scalar(private_key: PrivateScalar) -> Self {
        let public_key = derive_public_point(&private_key);
        Self {
            private_key,
            public_key,
        }
    }

    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_private_scalar(PrivateScalar::random(rng))
    }

    pub fn private_key(&self) -> &PrivateScalar {
        &self.private_key
    }

    pub fn public_key(&self) -> CurvePoint {
        self.public_key
    }

    /// Agree on a shared key with `peer`.
    pub fn agree(&self, peer: &CurvePoint) -> Result<DhResult> {
        agree(&self.private_key, peer)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &self.private_key)
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Outcome of a key agreement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhResult {
    /// The local party's public point, to be sent alongside the ciphertext.
    pub sender_public_key: CurvePoint,
    /// `Hash2(shared.x, shared.y)`.
    pub shared_key: FieldElement,
}

/// Compute `private_key * Base8`.
pub fn derive_public_point(private_key: &PrivateScalar) -> CurvePoint {
    let public_key = CurvePoint::base8().mul_le_bytes(private_key.le_bytes());
    debug!(x = %public_key.x(), y = %public_key.y(), "derived public point");
    public_key
}

/// Derive the shared key between `private_key` and a counterparty point.
///
/// The counterparty must be a non-identity point of the prime-order subgroup;
/// anything else fails with [`Error::InvalidPoint`]. This is stricter than the
/// noble-curves / Noir helpers, which multiply any on-curve point: small-order
/// and mixed-order points such as the raw generator G are refused here even
/// though they satisfy the curve equation. Honest public keys are always
/// `s * Base8` and are unaffected.
pub fn agree(private_key: &PrivateScalar, peer: &CurvePoint) -> Result<DhResult> {
    check_peer(peer)?;

    let sender_public_key = derive_public_point(private_key);
    let shared_point = peer.mul_le_bytes(private_key.le_bytes());
    let shared_key = hash2(shared_point.x(), shared_point.y());

    debug!(
        peer_x = %peer.x(),
        sender_x = %sender_public_key.x(),
        "key agreement complete"
    );

    Ok(DhResult {
        sender_public_key,
        shared_key,
    })
}

/// [`agree`] for raw counterparty coordinates, validating them first.
pub fn agree_with_coordinates(
    private_key: &PrivateScalar,
    peer_x: FieldElement,
    peer_y: FieldElement,
) -> Result<DhResult> {
    let peer = CurvePoint::new(peer_x, peer_y)?;
    agree(private_key, &peer)
}

fn check_peer(peer: &CurvePoint) -> Result<()> {
    if peer.is_identity() {
        return Err(Error::InvalidPoint(
            "counterparty public key is the identity".into(),
        ));
    }
    if !peer.is_in_prime_subgroup() {
        return Err(Error::InvalidPoint(format!(
            "counterparty public key ({}, {}) is outside the prime-order subgroup",
            peer.x(),
            peer.y()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::babyjubjub::subgroup_order;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn point(x: &str, y: &str) -> CurvePoint {
        CurvePoint::from_hex(x, y).unwrap()
    }

    fn alice() -> PrivateScalar {
        PrivateScalar::from_hex("0x1234").unwrap()
    }

    fn bob() -> PrivateScalar {
        PrivateScalar::from_hex("0x5678").unwrap()
    }

    #[test]
    fn scalar_one_yields_base8() {
        let one = PrivateScalar::from_field(FieldElement::ONE).unwrap();
        assert_eq!(derive_public_point(&one), CurvePoint::base8());
    }

    #[test]
    fn public_point_known_answers() {
        assert_eq!(
            derive_public_point(&alice()),
            point(
                "0x04771efd70c5a80a5d126bc32938ef618a7f94c605a6f9380edaf1341c7476eb",
                "0x07ec87859187550f7a9d39db03cf3f7cfb177cdab742f70fe80540868632064f",
            )
        );
        assert_eq!(
            derive_public_point(&bob()),
            point(
                "0x016883278d54d590700a09a95511d5f0a1223fff74d543a8109e2386e4cfb227",
                "0x2ac0dd3accab1eae232b50a4c04b07443e5a887882d20b8661c9200252de36a6",
            )
        );
    }

    #[test]
    fn both_parties_derive_the_same_key() {
        let a = KeyPair::from_private_scalar(alice());
        let b = KeyPair::from_private_scalar(bob());

        let from_a = a.agree(&b.public_key()).unwrap();
        let from_b = b.agree(&a.public_key()).unwrap();

        assert_eq!(from_a.shared_key, from_b.shared_key);
        assert_eq!(from_a.sender_public_key, a.public_key());
        assert_eq!(from_b.sender_public_key, b.public_key());
        assert_eq!(
            from_a.shared_key,
            FieldElement::from_hex("0x2af13ae38426c942e570187c67fc2dd18e36d7ae30f1cebeddd5a0708075f2dc")
                .unwrap()
        );
    }

    #[test]
    fn generated_key_pairs_agree() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let a = KeyPair::generate(&mut rng);
        let b = KeyPair::generate(&mut rng);
        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(
            a.agree(&b.public_key()).unwrap().shared_key,
            b.agree(&a.public_key()).unwrap().shared_key
        );
    }

    #[test]
    fn zero_scalar_is_rejected() {
        let err = PrivateScalar::from_field(FieldElement::ZERO).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        assert!("0".parse::<PrivateScalar>().is_err());
    }

    #[test]
    fn multiples_of_subgroup_order_are_rejected() {
        let l = subgroup_order();
        for multiple in [l, l + l, FieldElement::from_u64(7) * l] {
            let err = PrivateScalar::from_field(multiple).unwrap_err();
            assert!(matches!(err, Error::OutOfRange(_)));
        }

        // l + 1 acts as 1 on Base8.
        let wrapped = PrivateScalar::from_field(l + FieldElement::ONE).unwrap();
        assert_eq!(derive_public_point(&wrapped), CurvePoint::base8());
    }

    #[test]
    fn scalar_at_modulus_is_rejected() {
        let err = PrivateScalar::from_hex(crate::field::FIELD_MODULUS_HEX).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn zeroize_wipes_stored_bytes() {
        let mut scalar = alice();
        assert_ne!(scalar.le_bytes(), &[0u8; FIELD_BYTES]);
        scalar.zeroize();
        assert_eq!(scalar.le_bytes(), &[0u8; FIELD_BYTES]);
    }

    #[test]
    fn debug_output_is_redacted() {
        let pair = KeyPair::from_private_scalar(alice());
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("1234"));
    }

    #[test]
    fn rejects_off_curve_coordinates() {
        let err = agree_with_coordinates(&alice(), FieldElement::from_u64(5), FieldElement::from_u64(5))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPoint(_)));
    }

    #[test]
    fn rejects_identity_and_small_order_peers() {
        let identity = CurvePoint::identity();
        assert!(matches!(agree(&alice(), &identity), Err(Error::InvalidPoint(_))));

        let order_two = CurvePoint::new(FieldElement::ZERO, -FieldElement::ONE).unwrap();
        assert!(matches!(agree(&alice(), &order_two), Err(Error::InvalidPoint(_))));

        // G itself has order 8l.
        let generator = CurvePoint::generator();
        assert!(matches!(agree(&alice(), &generator), Err(Error::InvalidPoint(_))));
    }
}
