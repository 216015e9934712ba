use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use starknet::core::{
    crypto::compute_hash_on_elements,
    types::Felt,
    utils::{cairo_short_string_to_felt, get_selector_from_name, starknet_keccak},
};
use thiserror::Error;

/// Name of the domain struct in revision 0 typed data.
pub const DOMAIN_TYPE: &str = "StarkNetDomain";

/// Domain struct name used by revision 1, which hashes with Poseidon.
const REVISION_1_DOMAIN_TYPE: &str = "StarknetDomain";

const MESSAGE_PREFIX: &str = "StarkNet Message";

#[derive(Debug, Error)]
pub enum TypedDataError {
    #[error("Invalid SNIP-12 typed data JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown type `{0}`")]
    UnknownType(String),
    #[error("Unsupported type `{0}`")]
    UnsupportedType(String),
    #[error("Only revision 0 (StarkNetDomain) typed data is supported")]
    UnsupportedRevision,
    #[error("Missing field `{field}` in `{type_name}`")]
    MissingField { type_name: String, field: String },
    #[error("Field `{field}` is not declared by `{type_name}`")]
    UndeclaredField { type_name: String, field: String },
    #[error("Field `{field}` expects {expected}, got {value}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// SNIP-12 revision 0 typed data: a type schema, the primary type, a domain
/// and the message itself, in the same JSON shape wallets exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<TypedField>>,
    pub primary_type: String,
    pub domain: Value,
    pub message: Value,
}

type Result<T> = std::result::Result<T, TypedDataError>;

impl TypedData {
    /// Parse typed data from its JSON form (`types`, `primaryType`, `domain`, `message`).
    pub fn from_json(json: &str) -> Result<Self> {
        let typed: TypedData = serde_json::from_str(json)?;
        if typed.types.contains_key(REVISION_1_DOMAIN_TYPE) {
            return Err(TypedDataError::UnsupportedRevision);
        }
        Ok(typed)
    }

    fn fields(&self, type_name: &str) -> Result<&[TypedField]> {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .ok_or_else(|| TypedDataError::UnknownType(type_name.to_string()))
    }

    fn collect_dependencies(&self, type_name: &str, found: &mut BTreeSet<String>) -> Result<()> {
        if !found.insert(type_name.to_string()) {
            return Ok(());
        }
        for field in self.fields(type_name)? {
            let base = field.kind.trim_end_matches('*');
            if self.types.contains_key(base) {
                self.collect_dependencies(base, found)?;
            }
        }
        Ok(())
    }

    fn encode_single_type(&self, type_name: &str) -> Result<String> {
        let fields = self
            .fields(type_name)?
            .iter()
            .map(|field| format!("{}:{}", field.name, field.kind))
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!("{type_name}({fields})"))
    }

    /// `Name(field:type,...)` followed by every struct type it references,
    /// sorted by name.
    pub fn encode_type(&self, type_name: &str) -> Result<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(type_name, &mut dependencies)?;
        dependencies.remove(type_name);

        let mut encoded = self.encode_single_type(type_name)?;
        for dependency in &dependencies {
            encoded.push_str(&self.encode_single_type(dependency)?);
        }
        Ok(encoded)
    }

    pub fn type_hash(&self, type_name: &str) -> Result<Felt> {
        Ok(starknet_keccak(self.encode_type(type_name)?.as_bytes()))
    }

    /// Pedersen hash-on-elements of the type hash followed by every encoded field.
    /// The value must carry exactly the fields its type declares.
    pub fn struct_hash(&self, type_name: &str, value: &Value) -> Result<Felt> {
        let fields = self.fields(type_name)?;
        let object = value.as_object().ok_or_else(|| TypedDataError::InvalidValue {
            field: type_name.to_string(),
            expected: "an object",
            value: value.to_string(),
        })?;

        if let Some(undeclared) = object
            .keys()
            .find(|key| !fields.iter().any(|field| &field.name == *key))
        {
            return Err(TypedDataError::UndeclaredField {
                type_name: type_name.to_string(),
                field: undeclared.clone(),
            });
        }

        let mut elements = Vec::with_capacity(fields.len() + 1);
        elements.push(self.type_hash(type_name)?);
        for field in fields {
            let field_value =
                object
                    .get(&field.name)
                    .ok_or_else(|| TypedDataError::MissingField {
                        type_name: type_name.to_string(),
                        field: field.name.clone(),
                    })?;
            elements.push(self.encode_value(&field.name, &field.kind, field_value)?);
        }
        Ok(compute_hash_on_elements(&elements))
    }

    fn encode_value(&self, field: &str, kind: &str, value: &Value) -> Result<Felt> {
        if let Some(item_kind) = kind.strip_suffix('*') {
            let items = value.as_array().ok_or_else(|| TypedDataError::InvalidValue {
                field: field.to_string(),
                expected: "an array",
                value: value.to_string(),
            })?;
            let encoded = items
                .iter()
                .map(|item| self.encode_value(field, item_kind, item))
                .collect::<Result<Vec<_>>>()?;
            return Ok(compute_hash_on_elements(&encoded));
        }

        if self.types.contains_key(kind) {
            return self.struct_hash(kind, value);
        }

        match kind {
            "felt" | "string" => felt_from_value(field, value),
            "bool" => match value {
                Value::Bool(flag) => Ok(if *flag { Felt::ONE } else { Felt::ZERO }),
                Value::String(text) if text == "true" => Ok(Felt::ONE),
                Value::String(text) if text == "false" => Ok(Felt::ZERO),
                other => match felt_from_value(field, other)? {
                    felt if felt == Felt::ZERO || felt == Felt::ONE => Ok(felt),
                    _ => Err(TypedDataError::InvalidValue {
                        field: field.to_string(),
                        expected: "a boolean",
                        value: other.to_string(),
                    }),
                },
            },
            "selector" => match value {
                Value::String(name) if !is_numeric(name) => get_selector_from_name(name)
                    .map_err(|_| TypedDataError::InvalidValue {
                        field: field.to_string(),
                        expected: "an ASCII entry point name",
                        value: name.clone(),
                    }),
                other => felt_from_value(field, other),
            },
            "merkletree" => Err(TypedDataError::UnsupportedType(kind.to_string())),
            _ => Err(TypedDataError::UnknownType(kind.to_string())),
        }
    }

    pub fn domain_hash(&self) -> Result<Felt> {
        self.struct_hash(DOMAIN_TYPE, &self.domain)
    }

    /// Hash of the whole message as signed by `account`:
    /// `h("StarkNet Message", domain_hash, account, struct_hash(primaryType, message))`.
    pub fn message_hash(&self, account: Felt) -> Result<Felt> {
        let prefix = short_string(MESSAGE_PREFIX, MESSAGE_PREFIX)?;
        let domain_hash = self.domain_hash()?;
        let message_hash = self.struct_hash(&self.primary_type, &self.message)?;
        Ok(compute_hash_on_elements(&[
            prefix,
            domain_hash,
            account,
            message_hash,
        ]))
    }
}

fn is_numeric(text: &str) -> bool {
    text.starts_with("0x")
        || text.starts_with("0X")
        || (!text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()))
}

fn short_string(field: &str, text: &str) -> Result<Felt> {
    cairo_short_string_to_felt(text).map_err(|_| TypedDataError::InvalidValue {
        field: field.to_string(),
        expected: "a short string of at most 31 ASCII characters",
        value: text.to_string(),
    })
}

/// Interpret a JSON value as a field element: hex strings, decimal strings and
/// numbers are taken as integers, any other string is a Cairo short string.
pub fn felt_from_value(field: &str, value: &Value) -> Result<Felt> {
    let invalid = |expected| TypedDataError::InvalidValue {
        field: field.to_string(),
        expected,
        value: value.to_string(),
    };
    match value {
        Value::Number(number) => match number.as_u64() {
            Some(n) => Ok(Felt::from(n)),
            None => Felt::from_dec_str(&number.to_string()).map_err(|_| invalid("a field element")),
        },
        Value::String(text) if text.starts_with("0x") || text.starts_with("0X") => {
            Felt::from_hex(text).map_err(|_| invalid("a hex field element"))
        }
        Value::String(text) if is_numeric(text) => {
            Felt::from_dec_str(text).map_err(|_| invalid("a decimal field element"))
        }
        Value::String(text) => short_string(field, text),
        Value::Bool(flag) => Ok(if *flag { Felt::ONE } else { Felt::ZERO }),
        _ => Err(invalid("a field element")),
    }
}
