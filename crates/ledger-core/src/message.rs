//! Wire messages exchanged between peers.
//!
//! Every message is a JSON object with an integer `type` discriminant. Chain data
//! travels in a `data` field holding the JSON-encoded block array as a string:
//!
//! ```text
//! {"type":0}
//! {"type":1}
//! {"type":2,"data":"[{\"index\":0,...}]"}
//! ```
use crate::constants::{MSG_CHAIN_DATA, MSG_QUERY_ALL, MSG_QUERY_LATEST};
use crate::Block;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Ask for the peer's tip block.
    QueryLatest,
    /// Ask for the peer's whole chain.
    QueryAll,
    /// A tip announcement (one block) or a full chain (several).
    ChainData(Vec<Block>),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("missing or non-integer `type` field")]
    MissingType,
    #[error("unknown message type {0}")]
    UnknownType(u64),
    #[error("chain data message without `data` field")]
    MissingData,
    #[error("`data` must be a block array or a JSON string holding one")]
    InvalidData,
    #[error("chain data message carries no blocks")]
    EmptyChainData,
}

impl Message {
    pub fn kind(&self) -> u8 {
        match self {
            Message::QueryLatest => MSG_QUERY_LATEST,
            Message::QueryAll => MSG_QUERY_ALL,
            Message::ChainData(_) => MSG_CHAIN_DATA,
        }
    }

    pub fn encode(&self) -> Result<String, MessageError> {
        let value = match self {
            Message::QueryLatest | Message::QueryAll => json!({ "type": self.kind() }),
            Message::ChainData(blocks) => json!({
                "type": self.kind(),
                "data": serde_json::to_string(blocks)?,
            }),
        };
        Ok(value.to_string())
    }

    /// Parse and validate a raw frame. Unknown `type` values are rejected.
    pub fn decode(raw: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(raw)?;
        let obj = value.as_object().ok_or(MessageError::NotAnObject)?;
        let kind = obj
            .get("type")
            .and_then(Value::as_u64)
            .ok_or(MessageError::MissingType)?;

        match kind {
            k if k == MSG_QUERY_LATEST as u64 => Ok(Message::QueryLatest),
            k if k == MSG_QUERY_ALL as u64 => Ok(Message::QueryAll),
            k if k == MSG_CHAIN_DATA as u64 => {
                let data = obj.get("data").ok_or(MessageError::MissingData)?;
                let blocks: Vec<Block> = match data {
                    Value::String(s) => serde_json::from_str(s)?,
                    Value::Array(_) => serde_json::from_value(data.clone())?,
                    _ => return Err(MessageError::InvalidData),
                };
                if blocks.is_empty() {
                    return Err(MessageError::EmptyChainData);
                }
                Ok(Message::ChainData(blocks))
            }
            other => Err(MessageError::UnknownType(other)),
        }
    }
}
