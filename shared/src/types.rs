//! Common types used across the order core

use serde::{Deserialize, Serialize};

/// Marketplace order channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Consumer purchase at list price
    B2c,
    /// Business purchase, eligible for negotiated price agreements
    B2b,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::B2c => "b2c",
            OrderType::B2b => "b2b",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b2c" => Ok(OrderType::B2c),
            "b2b" => Ok(OrderType::B2b),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

/// Delivery address snapshot embedded in orders and schedules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryAddress {
    pub recipient: String,
    pub phone: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub subdistrict: Option<String>,
    pub district: String,
    pub province: String,
    pub postal_code: String,
}

/// Payment terms agreed for an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    #[default]
    Immediate,
    Net15,
    Net30,
}

impl PaymentTerms {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentTerms::Immediate => "immediate",
            PaymentTerms::Net15 => "net15",
            PaymentTerms::Net30 => "net30",
        }
    }
}

impl std::str::FromStr for PaymentTerms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(PaymentTerms::Immediate),
            "net15" => Ok(PaymentTerms::Net15),
            "net30" => Ok(PaymentTerms::Net30),
            other => Err(format!("unknown payment terms: {other}")),
        }
    }
}
