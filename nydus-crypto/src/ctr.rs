//! Poseidon2 counter-mode stream cipher over the field.
//!
//! ```text
//! k_i = Hash2(shared_key, i)
//! c_i = p_i + k_i   (mod M)
//! p_i = c_i - k_i   (mod M)
//! ```
//!
//! A note record is four field elements encrypted under fixed counters:
//! amount = 0, token address = 1, reference = 2, encryption key = 3. The
//! circuit recomputes the same keystream, so the slot order is part of the
//! wire format.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{poseidon2::hash2, FieldElement};

/// Number of fields in a full note record.
pub const RECORD_FIELDS: usize = 4;

/// Number of fields in the short (amount, token, reference) variant.
pub const SHORT_RECORD_FIELDS: usize = 3;

/// Keystream element for `counter`.
pub fn keystream(shared_key: FieldElement, counter: u64) -> FieldElement {
    trace!(counter, "deriving keystream element");
    hash2(shared_key, FieldElement::from_u64(counter))
}

pub fn encrypt_field(plaintext: FieldElement, shared_key: FieldElement, counter: u64) -> FieldElement {
    plaintext + keystream(shared_key, counter)
}

pub fn decrypt_field(ciphertext: FieldElement, shared_key: FieldElement, counter: u64) -> FieldElement {
    ciphertext - keystream(shared_key, counter)
}

/// Position of a field inside a note record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordSlot {
    Amount,
    TokenAddress,
    Reference,
    EncryptionKey,
}

impl RecordSlot {
    pub const ALL: [RecordSlot; RECORD_FIELDS] = [
        RecordSlot::Amount,
        RecordSlot::TokenAddress,
        RecordSlot::Reference,
        RecordSlot::EncryptionKey,
    ];

    /// Keystream counter bound to this slot.
    pub fn counter(self) -> u64 {
        match self {
            RecordSlot::Amount => 0,
            RecordSlot::TokenAddress => 1,
            RecordSlot::Reference => 2,
            RecordSlot::EncryptionKey => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordSlot::Amount => "amount",
            RecordSlot::TokenAddress => "token_address",
            RecordSlot::Reference => "ref",
            RecordSlot::EncryptionKey => "encryption_key",
        }
    }
}

/// Plaintext note record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub amount: FieldElement,
    pub token_address: FieldElement,
    #[serde(rename = "ref")]
    pub reference: FieldElement,
    pub encryption_key: FieldElement,
}

impl NoteRecord {
    pub fn new(
        amount: FieldElement,
        token_address: FieldElement,
        reference: FieldElement,
        encryption_key: FieldElement,
    ) -> Self {
        Self {
            amount,
            token_address,
            reference,
            encryption_key,
        }
    }

    pub fn get(&self, slot: RecordSlot) -> FieldElement {
        match slot {
            RecordSlot::Amount => self.amount,
            RecordSlot::TokenAddress => self.token_address,
            RecordSlot::Reference => self.reference,
            RecordSlot::EncryptionKey => self.encryption_key,
        }
    }

    /// Fields in slot order.
    pub fn to_fields(&self) -> [FieldElement; RECORD_FIELDS] {
        RecordSlot::ALL.map(|slot| self.get(slot))
    }

    pub fn from_fields(fields: [FieldElement; RECORD_FIELDS]) -> Self {
        let [amount, token_address, reference, encryption_key] = fields;
        Self::new(amount, token_address, reference, encryption_key)
    }
}

/// Ciphertext of a note record, in slot order.
///
/// Serializes as a JSON array of four hex strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedRecord {
    fields: [FieldElement; RECORD_FIELDS],
}

impl EncryptedRecord {
    pub fn from_fields(fields: [FieldElement; RECORD_FIELDS]) -> Self {
        Self { fields }
    }

    pub fn get(&self, slot: RecordSlot) -> FieldElement {
        self.fields[slot.counter() as usize]
    }

    pub fn fields(&self) -> &[FieldElement; RECORD_FIELDS] {
        &self.fields
    }
}

pub fn encrypt_record(record: &NoteRecord, shared_key: FieldElement) -> EncryptedRecord {
    let fields = RecordSlot::ALL.map(|slot| encrypt_field(record.get(slot), shared_key, slot.counter()));
    debug!(fields = RECORD_FIELDS, "encrypted note record");
    EncryptedRecord { fields }
}

pub fn decrypt_record(encrypted: &EncryptedRecord, shared_key: FieldElement) -> NoteRecord {
    let fields = RecordSlot::ALL.map(|slot| decrypt_field(encrypted.get(slot), shared_key, slot.counter()));
    debug!(fields = RECORD_FIELDS, "decrypted note record");
    NoteRecord::from_fields(fields)
}

/// Encrypt `(amount, token_address, ref)` under counters 0..=2.
pub fn encrypt_record_fields(
    fields: [FieldElement; SHORT_RECORD_FIELDS],
    shared_key: FieldElement,
) -> [FieldElement; SHORT_RECORD_FIELDS] {
    let mut out = fields;
    for (counter, field) in (0u64..).zip(out.iter_mut()) {
        *field = encrypt_field(*field, shared_key, counter);
    }
    debug!(fields = SHORT_RECORD_FIELDS, "encrypted short record");
    out
}

pub fn decrypt_record_fields(
    fields: [FieldElement; SHORT_RECORD_FIELDS],
    shared_key: FieldElement,
) -> [FieldElement; SHORT_RECORD_FIELDS] {
    let mut out = fields;
    for (counter, field) in (0u64..).zip(out.iter_mut()) {
        *field = decrypt_field(*field, shared_key, counter);
    }
    debug!(fields = SHORT_RECORD_FIELDS, "decrypted short record");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::modulus;

    fn fe(hex: &str) -> FieldElement {
        FieldElement::from_hex(hex).unwrap()
    }

    fn shared_key() -> FieldElement {
        fe("0x2af13ae38426c942e570187c67fc2dd18e36d7ae30f1cebeddd5a0708075f2dc")
    }

    fn sample_record() -> NoteRecord {
        NoteRecord::new(
            fe("0x64"),
            fe("0x58002bee8f43bf203964d38c54fa03e62d615959fa"),
            FieldElement::ZERO,
            shared_key(),
        )
    }

    #[test]
    fn keystream_known_answers() {
        let expected = [
            "0x2a4ef83e45f05f250c064e230d7d2c7d0ae1376057dee620766e75f81c764b0d",
            "0x21b70171eac15d8ffe28637d44d912ed0194442e48183e3bc141691b6e2f56b7",
            "0x1391d1c4959f9b23d4f7ec7e1ae6e3dd1d79cc3f09426f9f3f6724b3673af634",
            "0x04f66dba8dd62e0f046030f180dc31a31072180925a905aadb5652c55a118b64",
        ];
        for (counter, hex) in (0u64..).zip(expected) {
            assert_eq!(keystream(shared_key(), counter), fe(hex), "counter {counter}");
        }
    }

    #[test]
    fn record_ciphertext_known_answer() {
        let encrypted = encrypt_record(&sample_record(), shared_key());
        assert_eq!(
            encrypted.fields(),
            &[
                fe("0x2a4ef83e45f05f250c064e230d7d2c7d0ae1376057dee620766e75f81c764b71"),
                fe("0x21b70171eac15d8ffe2863d54505017c45536467acebca90bb454f48cf88b0b1"),
                fe("0x1391d1c4959f9b23d4f7ec7e1ae6e3dd1d79cc3f09426f9f3f6724b3673af634"),
                fe("0x2fe7a89e11fcf751e9d0496de8d85f749ea8efb7569ad469b92bf335da877e40"),
            ]
        );
        assert_eq!(decrypt_record(&encrypted, shared_key()), sample_record());
    }

    #[test]
    fn zero_plaintext_encrypts_to_keystream() {
        let key = shared_key();
        assert_eq!(encrypt_field(FieldElement::ZERO, key, 2), keystream(key, 2));
    }

    #[test]
    fn decryption_wraps_below_zero() {
        let key = shared_key();
        let k0 = keystream(key, 0);
        let plain = decrypt_field(FieldElement::ZERO, key, 0);
        assert_eq!(plain.to_biguint(), modulus() - k0.to_biguint());
        assert_eq!(encrypt_field(plain, key, 0), FieldElement::ZERO);
    }

    #[test]
    fn slots_use_distinct_counters() {
        let counters: Vec<u64> = RecordSlot::ALL.iter().map(|slot| slot.counter()).collect();
        assert_eq!(counters, vec![0, 1, 2, 3]);
        let record = sample_record();
        let encrypted = encrypt_record(&record, shared_key());
        for slot in RecordSlot::ALL {
            assert_eq!(
                encrypted.get(slot),
                encrypt_field(record.get(slot), shared_key(), slot.counter()),
                "{}",
                slot.name()
            );
        }
    }

    #[test]
    fn short_record_matches_leading_slots() {
        let record = sample_record();
        let short = encrypt_record_fields(
            [record.amount, record.token_address, record.reference],
            shared_key(),
        );
        let full = encrypt_record(&record, shared_key());
        assert_eq!(short[..], full.fields()[..SHORT_RECORD_FIELDS]);
        assert_eq!(
            decrypt_record_fields(short, shared_key()),
            [record.amount, record.token_address, record.reference]
        );
    }

    #[test]
    fn wrong_key_does_not_decrypt() {
        let encrypted = encrypt_record(&sample_record(), shared_key());
        let other = shared_key() + FieldElement::ONE;
        assert_ne!(decrypt_record(&encrypted, other), sample_record());
    }

    #[test]
    fn serde_wire_format() {
        let record = sample_record();
        let json = serde_json::to_value(record).unwrap();
        assert!(json.get("ref").is_some());
        assert_eq!(serde_json::from_value::<NoteRecord>(json).unwrap(), record);

        let encrypted = encrypt_record(&record, shared_key());
        let json = serde_json::to_value(encrypted).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(RECORD_FIELDS));
        assert_eq!(serde_json::from_value::<EncryptedRecord>(json).unwrap(), encrypted);
    }
}
