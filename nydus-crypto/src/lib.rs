//! # Nydus Note Cryptography
//!
//! Native implementation of the arithmetic the Nydus note circuit checks, so
//! that values prepared outside the circuit are bit-identical to what the
//! circuit recomputes.
//!
//! ## Overview
//!
//! - [`ecdh`]: Diffie-Hellman key agreement on Baby Jubjub. A private scalar
//!   and a counterparty public point yield a shared key, `Hash2(S.x, S.y)`.
//! - [`ctr`]: a counter-mode stream cipher over the field. Each record field
//!   is masked with `Hash2(shared_key, counter)` by modular addition.
//!
//! Both sit on [`field`] (BN254 scalar field elements), [`poseidon2`] (the
//! Poseidon2 hash used by Noir) and [`babyjubjub`] (the twisted Edwards curve
//! embedded in that field).
//!
//! ## Example
//!
//! ```
//! use nydus_crypto::{ctr, ecdh::KeyPair, FieldElement, NoteRecord};
//!
//! # fn main() -> nydus_crypto::Result<()> {
//! let sender = KeyPair::from_private_scalar("0x1234".parse()?);
//! let recipient = KeyPair::from_private_scalar("0x5678".parse()?);
//!
//! let dh = sender.agree(&recipient.public_key())?;
//! let record = NoteRecord::new(
//!     FieldElement::from_u64(100),
//!     FieldElement::from_hex("0x58002bee8f43bf203964d38c54fa03e62d615959fa")?,
//!     FieldElement::ZERO,
//!     dh.shared_key,
//! );
//! let encrypted = ctr::encrypt_record(&record, dh.shared_key);
//!
//! let recipient_key = recipient.agree(&dh.sender_public_key)?.shared_key;
//! assert_eq!(ctr::decrypt_record(&encrypted, recipient_key), record);
//! # Ok(())
//! # }
//! ```
//!
//! Nothing here is constant time. Scalar multiplication is a plain
//! double-and-add ladder, and only the bytes held by a
//! [`PrivateScalar`](ecdh::PrivateScalar) are zeroized.

pub mod babyjubjub;
pub mod ctr;
pub mod ecdh;
mod error;
pub mod field;
pub mod poseidon2;

pub use babyjubjub::{CurvePoint, BASE8_X, BASE8_Y};
pub use ctr::{
    decrypt_field, decrypt_record, decrypt_record_fields, encrypt_field, encrypt_record,
    encrypt_record_fields, keystream, EncryptedRecord, NoteRecord, RecordSlot,
};
pub use ecdh::{agree, agree_with_coordinates, derive_public_point, DhResult, KeyPair, PrivateScalar};
pub use error::{Error, Result};
pub use field::{FieldElement, FIELD_MODULUS_DEC, FIELD_MODULUS_HEX};
pub use poseidon2::{hash2, poseidon2_hash, Poseidon2Sponge};
