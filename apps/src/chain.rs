use std::collections::BTreeSet;
use std::fmt;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use starknet::{
    core::{
        crypto::Signature,
        types::{BlockId, BlockTag, ContractClass, Felt, FunctionCall},
        utils::{get_selector_from_name, parse_cairo_short_string},
    },
    providers::{jsonrpc::HttpTransport, JsonRpcClient, Provider},
};
use tracing::debug;
use url::Url;

pub const IS_VALID_SIGNATURE: &str = "is_valid_signature";

/// Function names a deployed class exposes, read from its ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInterface {
    functions: BTreeSet<String>,
}

impl ContractInterface {
    pub fn from_functions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            functions: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Collect every `"type": "function"` entry, including the ones nested in
    /// Cairo 1 `interface` items.
    pub fn from_abi(abi: &Value) -> Self {
        let mut functions = BTreeSet::new();
        collect_functions(abi, &mut functions);
        Self { functions }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }
}

fn collect_functions(node: &Value, functions: &mut BTreeSet<String>) {
    match node {
        Value::Array(entries) => entries
            .iter()
            .for_each(|entry| collect_functions(entry, functions)),
        Value::Object(entry) => {
            if entry.get("type").and_then(Value::as_str) == Some("function") {
                if let Some(name) = entry.get("name").and_then(Value::as_str) {
                    functions.insert(name.to_string());
                }
            }
            if let Some(items) = entry.get("items") {
                collect_functions(items, functions);
            }
        }
        _ => {}
    }
}

/// Read-only access to a Starknet network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch the class deployed at `address` and describe its interface.
    async fn get_interface(&self, address: Felt) -> Result<ContractInterface>;

    /// Call `entry_point` on `address` without sending a transaction.
    async fn call(&self, address: Felt, entry_point: &str, calldata: Vec<Felt>) -> Result<Vec<Felt>>;
}

/// [`ChainClient`] over a JSON-RPC node, always reading the latest block.
pub struct RpcChainClient {
    provider: JsonRpcClient<HttpTransport>,
}

impl RpcChainClient {
    pub fn new(rpc_url: Url) -> Self {
        Self {
            provider: JsonRpcClient::new(HttpTransport::new(rpc_url)),
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_interface(&self, address: Felt) -> Result<ContractInterface> {
        let class = self
            .provider
            .get_class_at(BlockId::Tag(BlockTag::Latest), address)
            .await
            .with_context(|| format!("failed to fetch class at {address:#x}"))?;
        let abi = match class {
            ContractClass::Sierra(class) => serde_json::from_str::<Value>(&class.abi)
                .context("class ABI is not valid JSON")?,
            ContractClass::Legacy(class) => serde_json::to_value(&class.abi)?,
        };
        let interface = ContractInterface::from_abi(&abi);
        debug!("class at {address:#x} exposes {:?}", interface.functions);
        Ok(interface)
    }

    async fn call(&self, address: Felt, entry_point: &str, calldata: Vec<Felt>) -> Result<Vec<Felt>> {
        let request = FunctionCall {
            contract_address: address,
            entry_point_selector: get_selector_from_name(entry_point)?,
            calldata,
        };
        self.provider
            .call(request, BlockId::Tag(BlockTag::Latest))
            .await
            .with_context(|| format!("call to {entry_point} on {address:#x} failed"))
    }
}

/// Decoded answer of `is_valid_signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid(String),
    /// The check could not be carried out; holds the error.
    Failed(String),
}

impl Verification {
    /// Cairo 1 accounts return the short string `'VALID'`, older ones `1`; zero is a rejection.
    pub fn decode(result: &[Felt]) -> Result<Self> {
        let first = result
            .first()
            .ok_or_else(|| anyhow!("{IS_VALID_SIGNATURE} returned no value"))?;
        if *first == Felt::ONE {
            return Ok(Self::Valid);
        }
        if *first == Felt::ZERO {
            return Ok(Self::Invalid("0".to_string()));
        }
        let text = parse_cairo_short_string(first)
            .map_err(|e| anyhow!("cannot decode {:#x} as a short string: {e}", first))?;
        Ok(if text == "VALID" {
            Self::Valid
        } else {
            Self::Invalid(text)
        })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::Invalid(answer) => write!(f, "INVALID ({answer})"),
            Self::Failed(error) => write!(f, "FAILED ({error})"),
        }
    }
}

/// An account contract, called through the interface it was fetched with.
pub struct AccountContract<'a, C: ?Sized> {
    client: &'a C,
    address: Felt,
    interface: ContractInterface,
}

impl<'a, C: ChainClient + ?Sized> AccountContract<'a, C> {
    pub fn new(client: &'a C, address: Felt, interface: ContractInterface) -> Self {
        Self {
            client,
            address,
            interface,
        }
    }

    /// Fetch the account's interface from the network and wrap it.
    pub async fn at(client: &'a C, address: Felt) -> Result<Self> {
        let interface = client.get_interface(address).await?;
        Ok(Self::new(client, address, interface))
    }

    pub async fn is_valid_signature(&self, hash: Felt, signature: &Signature) -> Result<Verification> {
        if !self.interface.has_function(IS_VALID_SIGNATURE) {
            bail!(
                "contract at {:#x} does not expose {IS_VALID_SIGNATURE}",
                self.address
            );
        }
        let parts = [signature.r, signature.s];
        let mut calldata = vec![hash, Felt::from(parts.len() as u64)];
        calldata.extend_from_slice(&parts);

        let result = self
            .client
            .call(self.address, IS_VALID_SIGNATURE, calldata)
            .await?;
        Verification::decode(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use starknet::core::utils::cairo_short_string_to_felt;
    use std::sync::Mutex;

    #[test]
    fn collects_functions_from_sierra_abi() {
        let abi = json!([
            { "type": "impl", "name": "AccountImpl", "interface_name": "ISRC6" },
            {
                "type": "interface",
                "name": "ISRC6",
                "items": [
                    { "type": "function", "name": "__execute__", "inputs": [], "outputs": [] },
                    { "type": "function", "name": "is_valid_signature", "inputs": [], "outputs": [] }
                ]
            },
            { "type": "constructor", "name": "constructor", "inputs": [] },
            { "type": "event", "name": "Event", "kind": "enum", "variants": [] }
        ]);
        let interface = ContractInterface::from_abi(&abi);
        assert!(interface.has_function(IS_VALID_SIGNATURE));
        assert!(interface.has_function("__execute__"));
        assert!(!interface.has_function("constructor"));
    }

    #[test]
    fn collects_functions_from_legacy_abi() {
        let abi = json!([
            { "type": "function", "name": "isValidSignature", "inputs": [], "outputs": [] },
            { "type": "struct", "name": "Call", "members": [], "size": 4 }
        ]);
        let interface = ContractInterface::from_abi(&abi);
        assert!(interface.has_function("isValidSignature"));
        assert!(!interface.has_function(IS_VALID_SIGNATURE));
    }

    #[test]
    fn decodes_account_answers() {
        let valid = cairo_short_string_to_felt("VALID").unwrap();
        assert_eq!(Verification::decode(&[valid]).unwrap(), Verification::Valid);
        assert_eq!(Verification::decode(&[Felt::ONE]).unwrap(), Verification::Valid);
        assert_eq!(
            Verification::decode(&[Felt::ZERO]).unwrap(),
            Verification::Invalid("0".to_string())
        );
        let nope = cairo_short_string_to_felt("NOPE").unwrap();
        assert_eq!(
            Verification::decode(&[nope]).unwrap(),
            Verification::Invalid("NOPE".to_string())
        );
        assert!(Verification::decode(&[]).is_err());
    }

    struct RecordingClient {
        calls: Mutex<Vec<(Felt, String, Vec<Felt>)>>,
    }

    #[async_trait]
    impl ChainClient for RecordingClient {
        async fn get_interface(&self, _address: Felt) -> Result<ContractInterface> {
            Ok(ContractInterface::from_functions([IS_VALID_SIGNATURE]))
        }

        async fn call(&self, address: Felt, entry_point: &str, calldata: Vec<Felt>) -> Result<Vec<Felt>> {
            self.calls
                .lock()
                .unwrap()
                .push((address, entry_point.to_string(), calldata));
            Ok(vec![cairo_short_string_to_felt("VALID").unwrap()])
        }
    }

    #[tokio::test]
    async fn encodes_hash_and_signature_array() {
        let client = RecordingClient {
            calls: Mutex::new(Vec::new()),
        };
        let account = AccountContract::at(&client, Felt::from(0x4d2u64)).await.unwrap();
        let signature = Signature {
            r: Felt::from(11u64),
            s: Felt::from(12u64),
        };
        let verification = account
            .is_valid_signature(Felt::from(99u64), &signature)
            .await
            .unwrap();
        assert!(verification.is_valid());

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (address, entry_point, calldata) = &calls[0];
        assert_eq!(*address, Felt::from(0x4d2u64));
        assert_eq!(entry_point, IS_VALID_SIGNATURE);
        assert_eq!(
            calldata,
            &vec![
                Felt::from(99u64),
                Felt::from(2u64),
                Felt::from(11u64),
                Felt::from(12u64)
            ]
        );
    }

    #[tokio::test]
    async fn missing_method_is_an_error() {
        let client = RecordingClient {
            calls: Mutex::new(Vec::new()),
        };
        let account = AccountContract::new(
            &client,
            Felt::ONE,
            ContractInterface::from_functions(["__execute__"]),
        );
        let signature = Signature {
            r: Felt::ONE,
            s: Felt::ONE,
        };
        let err = account
            .is_valid_signature(Felt::ONE, &signature)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not expose is_valid_signature"));
        assert!(client.calls.lock().unwrap().is_empty());
    }
}
