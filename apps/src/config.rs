use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use anyhow::Result;
use clap::Parser;
use common::{DomainParams, UnwrapRequest};
use starknet::core::types::Felt;
use url::Url;

/// Stark private key read from the environment. Never printed.
#[derive(Clone, Copy)]
pub struct PrivateKey(Felt);

impl PrivateKey {
    /// Exposes the key. Hand it straight to a signer and do not log it.
    pub fn expose_secret(&self) -> Felt {
        self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***REDACTED***)")
    }
}

pub fn parse_felt(s: &str) -> Result<Felt, String> {
    let parsed = if s.starts_with("0x") || s.starts_with("0X") {
        Felt::from_hex(s)
    } else {
        Felt::from_dec_str(s)
    };
    parsed.map_err(|_| format!("{s:?} is not a valid field element"))
}

fn parse_private_key(s: &str) -> Result<PrivateKey, String> {
    parse_felt(s)
        .map(PrivateKey)
        .map_err(|_| "PRIVATE_KEY is not a valid field element".to_string())
}

pub fn parse_token_id(s: &str) -> Result<U256, String> {
    U256::from_str(s.trim()).map_err(|e| format!("{s:?} is not a valid token id: {e}"))
}

/// Settings for signing and verifying unwrap messages, read once at startup
/// from the command line, the environment or `.env`.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// URL of the Starknet JSON-RPC endpoint.
    #[clap(short, long, env = "SEPOLIA_NODE_URL")]
    pub rpc_url: Url,

    /// Address of the account that signs and validates the message.
    #[clap(short = 'a', long, env = "ADDRESS", value_parser = parse_felt)]
    pub account_address: Felt,

    /// Stark private key of the account.
    #[clap(long, env = "PRIVATE_KEY", value_parser = parse_private_key, hide_env_values = true)]
    pub private_key: PrivateKey,

    /// Address placed in the message as the unwrapping user.
    #[clap(
        long,
        env = "USER_ADDRESS",
        value_parser = parse_felt,
        default_value = "0x63616c6c65725f61646472657373"
    )]
    pub user_address: Felt,

    /// Address of the wrapped NFT contract.
    #[clap(
        long,
        env = "NFT_CONTRACT_ADDRESS",
        value_parser = parse_felt,
        default_value = "0x6e8522a2b09895f76bae60aee06349eb1acc4590760453ddb8d56e85c89ca76"
    )]
    pub nft_contract_address: Felt,

    /// Dapp name in the signing domain.
    #[clap(long, env = "DAPP_NAME", default_value = "NFTWrapper")]
    pub dapp_name: String,

    #[clap(long, env = "DAPP_VERSION", default_value = "1")]
    pub dapp_version: String,

    /// Chain id short string, e.g. SN_SEPOLIA or SN_MAIN.
    #[clap(long, env = "CHAIN_ID", default_value = "SN_SEPOLIA")]
    pub chain_id: String,

    /// Token ids to sign and verify, one run each, in order.
    #[clap(
        long = "token-id",
        env = "TOKEN_IDS",
        value_delimiter = ',',
        value_parser = parse_token_id,
        default_values = ["1", "3"]
    )]
    pub token_ids: Vec<U256>,
}

impl Config {
    pub fn domain(&self) -> Result<DomainParams> {
        DomainParams::new(&self.dapp_name, &self.dapp_version, &self.chain_id)
    }

    pub fn unwrap_request(&self, token_id: U256) -> UnwrapRequest {
        UnwrapRequest {
            user_address: self.user_address,
            nft_contract_address: self.nft_contract_address,
            token_id,
        }
    }
}
