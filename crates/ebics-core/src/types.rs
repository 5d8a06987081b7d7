use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EbicsError, EbicsResult};
use crate::return_code::EBICS_INVALID_ORDER_TYPE;

/// Direction of a file transfer, seen from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    Upload,
    Download,
}

/// Phase reported in the mutable header of a transaction response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPhase {
    Initialisation,
    Transfer,
    Receipt,
}

impl FromStr for TransactionPhase {
    type Err = EbicsError;

    fn from_str(s: &str) -> EbicsResult<Self> {
        match s.trim() {
            "Initialisation" => Ok(Self::Initialisation),
            "Transfer" => Ok(Self::Transfer),
            "Receipt" => Ok(Self::Receipt),
            other => Err(EbicsError::malformed(format!(
                "unknown transaction phase '{other}'"
            ))),
        }
    }
}

/// Three-character order type code, e.g. `FUL`, `STA`, `HPB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderType(String);

impl OrderType {
    pub fn new(code: impl Into<String>) -> EbicsResult<Self> {
        let code = code.into();
        let valid = code.len() == 3
            && code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(EbicsError::protocol(
                EBICS_INVALID_ORDER_TYPE,
                format!("order type '{code}' must be three upper-case alphanumerics"),
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderType {
    type Error = EbicsError;

    fn try_from(value: String) -> EbicsResult<Self> {
        Self::new(value)
    }
}

impl From<OrderType> for String {
    fn from(value: OrderType) -> Self {
        value.0
    }
}

/// Identity of the subscriber on whose behalf requests are made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub host_id: String,
    pub partner_id: String,
    pub user_id: String,
}
