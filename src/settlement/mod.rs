use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::carrier::{Carrier, CarrierTier};
use crate::models::request::RequestStatus;
use crate::models::settlement::{
    EarningsBreakdown, InvoiceStatus, Period, Settlement, TaxInvoice,
};
use crate::state::AppState;

/// 3.3% freelance withholding, in per-mille to keep won math integral.
const WITHHOLDING_TAX_PER_MILLE: i64 = 33;
/// 10% VAT on tax invoices.
const VAT_PER_MILLE: i64 = 100;
const ACTIVITY_BONUS_WON: i64 = 20_000;
const ACTIVITY_BONUS_THRESHOLD: u32 = 20;
const QUALITY_BONUS_WON: i64 = 10_000;
const QUALITY_RATING_THRESHOLD: f64 = 4.5;

/// Outcome of one scheduled batch run. Per-carrier failures land in
/// `errors`; the run itself keeps going (best-effort batch).
#[derive(Debug, Clone, Serialize)]
pub struct PeriodRunResult {
    pub processed: u32,
    pub generated: u32,
    pub total_amount_won: i64,
    pub errors: Vec<String>,
}

/// Monthly settlement pass, tier by tier. Idempotent: a carrier already
/// settled for the period is skipped, and carriers with no qualifying
/// deliveries never produce a record.
pub fn run_period(state: &AppState, year: i32, month: u32) -> Result<PeriodRunResult, AppError> {
    let period = check_period(year, month)?;

    let mut result = PeriodRunResult {
        processed: 0,
        generated: 0,
        total_amount_won: 0,
        errors: Vec::new(),
    };

    for tier in [CarrierTier::Bronze, CarrierTier::Silver, CarrierTier::Gold] {
        let carriers: Vec<Carrier> = state
            .carriers
            .iter()
            .filter(|entry| entry.tier() == tier)
            .map(|entry| entry.value().clone())
            .collect();

        for carrier in carriers {
            result.processed += 1;

            if already_settled(state, carrier.id, period) {
                continue;
            }

            let (count, base) = period_earnings(state, carrier.id, period);
            if count == 0 {
                continue;
            }

            match settle_carrier(&carrier, tier, period, count, base) {
                Ok(settlement) => {
                    result.generated += 1;
                    result.total_amount_won += settlement.earnings.net;
                    info!(
                        carrier_id = %carrier.id,
                        net = settlement.earnings.net,
                        deliveries = count,
                        "settlement generated"
                    );
                    state.settlements.insert(settlement.id, settlement);
                }
                Err(reason) => {
                    warn!(carrier_id = %carrier.id, reason, "carrier skipped with error");
                    result.errors.push(format!("carrier {}: {reason}", carrier.id));
                }
            }
        }
    }

    let outcome = if result.errors.is_empty() {
        "success"
    } else {
        "partial"
    };
    state
        .metrics
        .settlement_runs_total
        .with_label_values(&[outcome])
        .inc();

    Ok(result)
}

/// One tax invoice per settlement of the period: supply amount
/// is the settled net, plus 10% VAT. Idempotent per settlement.
pub fn run_invoices(state: &AppState, year: i32, month: u32) -> Result<PeriodRunResult, AppError> {
    let period = check_period(year, month)?;

    let mut result = PeriodRunResult {
        processed: 0,
        generated: 0,
        total_amount_won: 0,
        errors: Vec::new(),
    };

    let settlements: Vec<Settlement> = state
        .settlements
        .iter()
        .filter(|entry| entry.period == period)
        .map(|entry| entry.value().clone())
        .collect();

    for settlement in settlements {
        result.processed += 1;

        let exists = state
            .invoices
            .iter()
            .any(|entry| entry.settlement_id == settlement.id);
        if exists {
            continue;
        }

        let supply_amount = settlement.earnings.net;
        let vat = supply_amount * VAT_PER_MILLE / 1_000;
        let invoice = TaxInvoice {
            id: Uuid::new_v4(),
            settlement_id: settlement.id,
            carrier_id: settlement.carrier_id,
            period,
            supply_amount,
            vat,
            total: supply_amount + vat,
            status: InvoiceStatus::Issued,
            created_at: Utc::now(),
        };

        result.generated += 1;
        result.total_amount_won += invoice.total;
        state.invoices.insert(invoice.id, invoice);
    }

    Ok(result)
}

fn check_period(year: i32, month: u32) -> Result<Period, AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::BadRequest(format!("invalid month: {month}")));
    }
    Ok(Period { year, month })
}

fn already_settled(state: &AppState, carrier_id: Uuid, period: Period) -> bool {
    state
        .settlements
        .iter()
        .any(|entry| entry.carrier_id == carrier_id && entry.period == period)
}

/// Completed deliveries of one carrier in the period: count and summed
/// fees.
fn period_earnings(state: &AppState, carrier_id: Uuid, period: Period) -> (u32, i64) {
    state
        .requests
        .iter()
        .filter(|entry| {
            entry.status == RequestStatus::Completed
                && entry.carrier_id == Some(carrier_id)
                && entry.completed_at.is_some_and(|at| {
                    at.year() == period.year && at.month() == period.month
                })
        })
        .fold((0, 0), |(count, sum), entry| {
            (count + 1, sum + entry.fee_won)
        })
}

fn settle_carrier(
    carrier: &Carrier,
    tier: CarrierTier,
    period: Period,
    count: u32,
    base: i64,
) -> Result<Settlement, String> {
    if carrier.bank_account.is_none() {
        return Err("no bank account on file".to_string());
    }

    let tier_bonus = (base as f64 * tier.bonus_rate()).round() as i64;
    let activity_bonus = if count >= ACTIVITY_BONUS_THRESHOLD {
        ACTIVITY_BONUS_WON
    } else {
        0
    };
    let quality_bonus = if carrier.rating >= QUALITY_RATING_THRESHOLD {
        QUALITY_BONUS_WON
    } else {
        0
    };
    let subtotal = base + tier_bonus + activity_bonus + quality_bonus;
    let withholding_tax = subtotal * WITHHOLDING_TAX_PER_MILLE / 1_000;

    Ok(Settlement {
        id: Uuid::new_v4(),
        carrier_id: carrier.id,
        tier,
        period,
        delivery_count: count,
        earnings: EarningsBreakdown {
            base,
            tier_bonus,
            activity_bonus,
            quality_bonus,
            subtotal,
            withholding_tax,
            net: subtotal - withholding_tax,
        },
        bank_account: carrier.bank_account.clone(),
        created_at: Utc::now(),
    })
}
