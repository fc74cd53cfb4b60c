use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::carrier::CarrierTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

/// Earnings breakdown in won. All amounts are integral won; tax rounds down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsBreakdown {
    pub base: i64,
    pub tier_bonus: i64,
    pub activity_bonus: i64,
    pub quality_bonus: i64,
    pub subtotal: i64,
    pub withholding_tax: i64,
    pub net: i64,
}

/// One settlement per carrier per period; immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub carrier_id: Uuid,
    pub tier: CarrierTier,
    pub period: Period,
    pub delivery_count: u32,
    pub earnings: EarningsBreakdown,
    pub bank_account: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum InvoiceStatus {
    Issued,
}

/// Tax invoice derived from a completed settlement: supply amount plus 10%
/// VAT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxInvoice {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub carrier_id: Uuid,
    pub period: Period,
    pub supply_amount: i64,
    pub vat: i64,
    pub total: i64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}
