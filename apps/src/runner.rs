use alloy_primitives::U256;
use anyhow::Result;
use common::{unwrap_typed_data, Signer};
use starknet::core::{crypto::Signature, types::Felt};
use tracing::{error, info, info_span, Instrument};

use crate::chain::{AccountContract, ChainClient, Verification};
use crate::config::Config;

/// What one unwrap run signed, hashed and learned from the account contract.
#[derive(Debug)]
pub struct RunReport {
    pub token_id: U256,
    pub public_key: Felt,
    pub signature: Signature,
    pub message_hash: Felt,
    pub verification: Verification,
}

/// Result of one run of [`run_all`]. An error means the run stopped before
/// the on-chain check.
#[derive(Debug)]
pub struct RunOutcome {
    pub token_id: U256,
    pub result: Result<RunReport>,
}

async fn verify_on_chain<C>(
    client: &C,
    account: Felt,
    message_hash: Felt,
    signature: &Signature,
) -> Result<Verification>
where
    C: ChainClient + ?Sized,
{
    let contract = AccountContract::at(client, account).await?;
    contract.is_valid_signature(message_hash, signature).await
}

/// Sign the unwrap message for `token_id` and ask the account contract to validate it.
///
/// Failures while fetching the account class or calling it are logged and
/// reported as [`Verification::Failed`]; only building, signing or hashing
/// the message can make this return an error.
pub async fn run_once<S, C>(
    config: &Config,
    signer: &S,
    client: &C,
    token_id: U256,
) -> Result<RunReport>
where
    S: Signer + ?Sized,
    C: ChainClient + ?Sized,
{
    let typed_data = unwrap_typed_data(&config.domain()?, &config.unwrap_request(token_id));

    let public_key = signer.public_key();
    info!("public key: {public_key:#x}");

    let signature = signer.sign_typed_data(&typed_data)?;
    info!("signature: r={:#x} s={:#x}", signature.r, signature.s);

    let message_hash = typed_data.message_hash(signer.address())?;
    info!("message hash: {message_hash:#x}");

    let verification =
        match verify_on_chain(client, signer.address(), message_hash, &signature).await {
            Ok(verification) => {
                info!("signature is: {verification}");
                verification
            }
            Err(e) => {
                error!("signature check failed: {e:#}");
                Verification::Failed(format!("{e:#}"))
            }
        };

    Ok(RunReport {
        token_id,
        public_key,
        signature,
        message_hash,
        verification,
    })
}

/// Run [`run_once`] for each token id in order. Every run is independent: a
/// failed run is recorded and the next one still starts.
pub async fn run_all<S, C>(
    config: &Config,
    signer: &S,
    client: &C,
    token_ids: &[U256],
) -> Vec<RunOutcome>
where
    S: Signer + ?Sized,
    C: ChainClient + ?Sized,
{
    let mut outcomes = Vec::with_capacity(token_ids.len());
    for &token_id in token_ids {
        let result = run_once(config, signer, client, token_id)
            .instrument(info_span!("unwrap", %token_id))
            .await;
        if let Err(e) = &result {
            error!(%token_id, "run failed: {e:#}");
        }
        outcomes.push(RunOutcome { token_id, result });
    }
    outcomes
}
