use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::{Signer, StarkKeySigner, TypedData};
use starknet::core::types::Felt;
use unwrap_sign::config::parse_felt;

/// CLI to sign a SNIP-12 typed-data JSON file and print hash, signature, and signer.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the typed-data JSON file to sign.
    #[clap(long, value_name = "FILE")]
    file_path: PathBuf,

    /// Optional private key to use for signing; if omitted, a random key is generated.
    #[clap(long, env = "PRIVATE_KEY", value_parser = parse_felt, hide_env_values = true)]
    private_key: Option<Felt>,

    /// Account address the message hash is bound to; defaults to the public key.
    #[clap(long, env = "ADDRESS", value_parser = parse_felt)]
    address: Option<Felt>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let json = fs::read_to_string(&args.file_path)
        .with_context(|| format!("failed to read {}", args.file_path.display()))?;
    let typed_data = TypedData::from_json(&json)?;

    // Obtain signer (existing or random)
    let signer = match args.private_key {
        Some(pk) => {
            let address = args
                .address
                .unwrap_or_else(|| StarkKeySigner::new(Felt::ZERO, pk).public_key());
            StarkKeySigner::new(address, pk)
        }
        None => StarkKeySigner::random(args.address),
    };

    let message_hash = typed_data.message_hash(signer.address())?;
    let signature = signer.sign_hash(&message_hash)?;

    println!("File: {}", args.file_path.display());
    println!("Message hash: {:#x}", message_hash);
    println!("Signature: [{:#x}, {:#x}]", signature.r, signature.s);
    println!("Signer: {:#x}", signer.address());
    println!("Public key: {:#x}", signer.public_key());

    Ok(())
}
