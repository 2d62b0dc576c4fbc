use serde::{Deserialize, Deserializer, Serialize};

/// A block as delivered by the remote source.
///
/// Only the parts the pipeline filters on are kept: the number and the full transaction
/// objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(with = "quantity")]
    pub number: u64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(number: u64, transactions: Vec<Transaction>) -> Self {
        Self { number, transactions }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    #[serde(deserialize_with = "nullable_string")]
    pub from: String,
    /// Empty for contract creations.
    #[serde(default, deserialize_with = "nullable_string")]
    pub to: String,
}

impl Transaction {
    pub fn new(hash: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { hash: hash.into(), from: from.into(), to: to.into() }
    }

    /// Sender then receiver. The empty receiver of a contract creation is skipped; a
    /// self-transfer yields the same address twice.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        let to = (!self.to.is_empty()).then_some(self.to.as_str());
        std::iter::once(self.from.as_str()).chain(to)
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Hex-encoded quantities (`"0x1b4"`) as used on the JSON-RPC wire.
pub mod quantity {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<u64, std::num::ParseIntError> {
        let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
        u64::from_str_radix(digits, 16)
    }

    pub fn format(number: u64) -> String {
        format!("{number:#x}")
    }

    pub fn serialize<S: Serializer>(number: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*number))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid quantity {raw:?}: {e}")))
    }
}
