use std::fmt;

use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use nydus_crypto::{
    agree, decrypt_record, decrypt_record_fields, derive_public_point, encrypt_record,
    encrypt_record_fields, keystream, CurvePoint, DhResult, EncryptedRecord, FieldElement,
    KeyPair, NoteRecord, PrivateScalar,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "nydus_tools=info,nydus_crypto=info";

// Fixed vector shared with the circuit test suite.
const VECTOR_ALICE: &str = "0x1234";
const VECTOR_BOB: &str = "0x5678";
const VECTOR_SHARED_KEY: &str = "0x2af13ae38426c942e570187c67fc2dd18e36d7ae30f1cebeddd5a0708075f2dc";
const VECTOR_TOKEN_ADDRESS: &str = "0x58002bee8f43bf203964d38c54fa03e62d615959fa";
const VECTOR_AMOUNT: u64 = 100;

#[derive(Parser)]
#[command(
    name = "nydus-tools",
    about = "Key agreement and note encryption test vectors for the Nydus circuit"
)]
struct Cli {
    /// Print human-readable lines instead of JSON.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the public point for a private scalar.
    PublicKey(PublicKeyArgs),
    /// Derive the shared key with a counterparty public point.
    Agree(AgreeArgs),
    /// Print the keystream element for a shared key and counter.
    Keystream(KeystreamArgs),
    /// Encrypt a note record (three fields when --encryption-key is omitted).
    EncryptRecord(EncryptRecordArgs),
    /// Decrypt a three- or four-field ciphertext.
    DecryptRecord(DecryptRecordArgs),
    /// Check the fixed vectors and a random round trip.
    SelfTest(SelfTestArgs),
}

#[derive(Args)]
struct PublicKeyArgs {
    /// Private scalar, hex (0x...) or decimal.
    #[arg(long)]
    private_key: String,
}

#[derive(Args)]
struct AgreeArgs {
    /// Private scalar, hex (0x...) or decimal.
    #[arg(long)]
    private_key: String,
    #[arg(long)]
    peer_x: FieldElement,
    #[arg(long)]
    peer_y: FieldElement,
}

#[derive(Args)]
struct KeystreamArgs {
    #[arg(long)]
    shared_key: FieldElement,
    #[arg(long, default_value_t = 0)]
    counter: u64,
}

#[derive(Args)]
struct EncryptRecordArgs {
    #[arg(long)]
    amount: FieldElement,
    #[arg(long)]
    token_address: FieldElement,
    #[arg(long = "ref", default_value = "0x00")]
    reference: FieldElement,
    #[arg(long)]
    encryption_key: Option<FieldElement>,
    #[arg(long)]
    shared_key: FieldElement,
}

#[derive(Args)]
struct DecryptRecordArgs {
    /// Ciphertext fields in slot order.
    #[arg(long, num_args = 3..=4, required = true)]
    ciphertext: Vec<FieldElement>,
    #[arg(long)]
    shared_key: FieldElement,
}

#[derive(Args)]
struct SelfTestArgs {
    /// Seed for the random key pairs. Uses OS entropy when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::PublicKey(args) => public_key(args, cli.plain),
        Commands::Agree(args) => agree_cmd(args, cli.plain),
        Commands::Keystream(args) => keystream_cmd(args, cli.plain),
        Commands::EncryptRecord(args) => encrypt_record_cmd(args, cli.plain),
        Commands::DecryptRecord(args) => decrypt_record_cmd(args, cli.plain),
        Commands::SelfTest(args) => self_test(args, cli.plain),
    }
}

fn public_key(args: PublicKeyArgs, plain: bool) -> Result<()> {
    let private_key = parse_private_key(&args.private_key)?;
    let point = derive_public_point(&private_key);
    output_summary(&PointSummary::from(point), plain)
}

fn agree_cmd(args: AgreeArgs, plain: bool) -> Result<()> {
    let private_key = parse_private_key(&args.private_key)?;
    let peer = CurvePoint::new(args.peer_x, args.peer_y).context("invalid counterparty public key")?;
    let result = agree(&private_key, &peer).context("key agreement failed")?;
    output_summary(&AgreeSummary(result), plain)
}

fn keystream_cmd(args: KeystreamArgs, plain: bool) -> Result<()> {
    let summary = KeystreamSummary {
        counter: args.counter,
        keystream: keystream(args.shared_key, args.counter),
    };
    output_summary(&summary, plain)
}

fn encrypt_record_cmd(args: EncryptRecordArgs, plain: bool) -> Result<()> {
    let ciphertext = match args.encryption_key {
        Some(encryption_key) => {
            let record = NoteRecord::new(args.amount, args.token_address, args.reference, encryption_key);
            encrypt_record(&record, args.shared_key).fields().to_vec()
        }
        None => {
            let fields = [args.amount, args.token_address, args.reference];
            encrypt_record_fields(fields, args.shared_key).to_vec()
        }
    };
    info!(fields = ciphertext.len(), "encrypted record");
    output_summary(&FieldList::new("ciphertext", ciphertext), plain)
}

fn decrypt_record_cmd(args: DecryptRecordArgs, plain: bool) -> Result<()> {
    let plaintext = match args.ciphertext.as_slice() {
        &[amount, token_address, reference] => {
            decrypt_record_fields([amount, token_address, reference], args.shared_key).to_vec()
        }
        &[amount, token_address, reference, encryption_key] => {
            let encrypted =
                EncryptedRecord::from_fields([amount, token_address, reference, encryption_key]);
            decrypt_record(&encrypted, args.shared_key).to_fields().to_vec()
        }
        other => bail!("expected 3 or 4 ciphertext fields, got {}", other.len()),
    };
    output_summary(&FieldList::new("plaintext", plaintext), plain)
}

fn self_test(args: SelfTestArgs, plain: bool) -> Result<()> {
    let alice = KeyPair::from_private_scalar(parse_private_key(VECTOR_ALICE)?);
    let bob = KeyPair::from_private_scalar(parse_private_key(VECTOR_BOB)?);

    let from_alice = alice.agree(&bob.public_key())?;
    let from_bob = bob.agree(&alice.public_key())?;
    ensure!(
        from_alice.shared_key == from_bob.shared_key,
        "fixed vector: parties derived different shared keys"
    );
    let expected_key = FieldElement::from_hex(VECTOR_SHARED_KEY)?;
    ensure!(
        from_alice.shared_key == expected_key,
        "fixed vector: shared key {} does not match {}",
        from_alice.shared_key,
        expected_key
    );

    let record = NoteRecord::new(
        FieldElement::from_u64(VECTOR_AMOUNT),
        FieldElement::from_hex(VECTOR_TOKEN_ADDRESS)?,
        FieldElement::ZERO,
        from_alice.shared_key,
    );
    let encrypted = encrypt_record(&record, from_alice.shared_key);
    ensure!(
        decrypt_record(&encrypted, from_bob.shared_key) == record,
        "fixed vector: record did not survive the round trip"
    );
    info!("fixed vectors passed");

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sender = KeyPair::generate(&mut rng);
    let recipient = KeyPair::generate(&mut rng);
    let dh = sender.agree(&recipient.public_key())?;
    let received_key = recipient.agree(&dh.sender_public_key)?.shared_key;
    let random_record = NoteRecord::new(
        FieldElement::from_u64(VECTOR_AMOUNT),
        FieldElement::from_hex(VECTOR_TOKEN_ADDRESS)?,
        FieldElement::ONE,
        dh.shared_key,
    );
    let random_round_trip =
        decrypt_record(&encrypt_record(&random_record, dh.shared_key), received_key) == random_record;
    ensure!(random_round_trip, "random key pairs failed the record round trip");
    info!("random round trip passed");

    let summary = SelfTestSummary {
        alice_public_key: alice.public_key().into(),
        bob_public_key: bob.public_key().into(),
        shared_key: from_alice.shared_key,
        record,
        ciphertext: encrypted,
        random_round_trip,
    };
    output_summary(&summary, plain)
}

/// Parse a private scalar without echoing it back in the error.
fn parse_private_key(text: &str) -> Result<PrivateScalar> {
    text.parse::<PrivateScalar>()
        .map_err(|_| anyhow!("private key must be below the field modulus and not a multiple of the subgroup order"))
}

fn output_summary<T>(summary: &T, plain: bool) -> Result<()>
where
    T: Serialize + fmt::Display,
{
    if plain {
        print!("{}", summary);
    } else {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct PointSummary {
    x: FieldElement,
    y: FieldElement,
}

impl From<CurvePoint> for PointSummary {
    fn from(point: CurvePoint) -> Self {
        Self {
            x: point.x(),
            y: point.y(),
        }
    }
}

impl fmt::Display for PointSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "x: {}", self.x)?;
        writeln!(f, "y: {}", self.y)
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct AgreeSummary(DhResult);

impl fmt::Display for AgreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sender_public_key.x: {}", self.0.sender_public_key.x())?;
        writeln!(f, "sender_public_key.y: {}", self.0.sender_public_key.y())?;
        writeln!(f, "shared_key: {}", self.0.shared_key)
    }
}

#[derive(Serialize)]
struct KeystreamSummary {
    counter: u64,
    keystream: FieldElement,
}

impl fmt::Display for KeystreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "counter: {}", self.counter)?;
        writeln!(f, "keystream: {}", self.keystream)
    }
}

#[derive(Serialize)]
struct FieldList {
    #[serde(skip)]
    label: &'static str,
    fields: Vec<FieldElement>,
}

impl FieldList {
    fn new(label: &'static str, fields: Vec<FieldElement>) -> Self {
        Self { label, fields }
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (counter, field) in self.fields.iter().enumerate() {
            writeln!(f, "{}[{}]: {}", self.label, counter, field)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SelfTestSummary {
    alice_public_key: PointSummary,
    bob_public_key: PointSummary,
    shared_key: FieldElement,
    record: NoteRecord,
    ciphertext: EncryptedRecord,
    random_round_trip: bool,
}

impl fmt::Display for SelfTestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alice public key: ({}, {})", self.alice_public_key.x, self.alice_public_key.y)?;
        writeln!(f, "bob public key: ({}, {})", self.bob_public_key.x, self.bob_public_key.y)?;
        writeln!(f, "shared key: {}", self.shared_key)?;
        for (counter, field) in self.ciphertext.fields().iter().enumerate() {
            writeln!(f, "ciphertext[{}]: {}", counter, field)?;
        }
        writeln!(f, "random round trip: {}", if self.random_round_trip { "ok" } else { "FAILED" })
    }
}
