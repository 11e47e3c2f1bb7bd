use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analytics::AnalyticsId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionLineId(pub String);

impl TransactionLineId {
    pub fn generate() -> Self {
        Self(format!("line-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PurchaseOrder,
    VendorBill,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseOrder => "purchase_order",
            Self::VendorBill => "vendor_bill",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "purchase_order" => Some(Self::PurchaseOrder),
            "vendor_bill" => Some(Self::VendorBill),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Confirmed,
    Posted,
    Paid,
    Cancelled,
}

/// Statuses whose lines count as history.
pub const TERMINAL_DOCUMENT_STATUSES: &[DocumentStatus] =
    &[DocumentStatus::Confirmed, DocumentStatus::Posted, DocumentStatus::Paid];

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        TERMINAL_DOCUMENT_STATUSES.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Posted => "posted",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "confirmed" => Some(Self::Confirmed),
            "posted" => Some(Self::Posted),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One past transaction line that carried a cost center.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub line_id: TransactionLineId,
    pub date: NaiveDate,
    pub partner_name: Option<String>,
    pub product_name: Option<String>,
    pub analytics_id: AnalyticsId,
    pub analytics_name: String,
    pub analytics_kind: String,
    pub amount: Decimal,
    pub auto_assigned: bool,
}
