use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::EngineError,
    models::{
        account::AccountStanding, bill::FinalBill, session::Settlement, types::SettlementChoice,
    },
    services::payment::{PaymentGateway, PaymentReceipt},
};

#[derive(Clone, Debug, PartialEq)]
pub struct SettlementOutcome {
    pub standing: AccountStanding,
    pub settlement: Settlement,
    /// Approved charge behind a `PayNow`, refunded if the outcome cannot be stored.
    pub receipt: Option<PaymentReceipt>,
}

/// Resolves a final bill against the account.
///
/// `PayNow` charges the full payable and clears the account; a declined charge
/// returns `PaymentFailed` and the caller keeps its previous standing. `PayLater`
/// never charges and records the whole payable as outstanding.
pub fn settle(
    bill: &FinalBill,
    choice: SettlementChoice,
    current: &AccountStanding,
    gateway: &dyn PaymentGateway,
    now: DateTime<Utc>,
) -> Result<SettlementOutcome, EngineError> {
    match choice {
        SettlementChoice::PayNow => {
            let receipt = charge(gateway, &current.account_id, bill.total_payable)?;

            Ok(SettlementOutcome {
                standing: current.cleared(now),
                settlement: Settlement {
                    choice,
                    amount_charged: bill.total_payable,
                    payment_reference: receipt.reference.clone(),
                    settled_at: now,
                },
                receipt: Some(receipt),
            })
        }
        SettlementChoice::PayLater => Ok(SettlementOutcome {
            standing: current.deferred(bill.total_payable, now),
            settlement: Settlement {
                choice,
                amount_charged: Decimal::ZERO,
                payment_reference: None,
                settled_at: now,
            },
            receipt: None,
        }),
    }
}

/// Pays off a deferred balance, the only way back to `Active`.
pub fn clear_dues(
    current: &AccountStanding,
    gateway: &dyn PaymentGateway,
    now: DateTime<Utc>,
) -> Result<(AccountStanding, PaymentReceipt), EngineError> {
    if current.outstanding_amount <= Decimal::ZERO {
        return Err(EngineError::NoOutstandingDues(current.account_id.clone()));
    }

    let receipt = charge(gateway, &current.account_id, current.outstanding_amount)?;
    Ok((current.cleared(now), receipt))
}

pub(crate) fn charge(
    gateway: &dyn PaymentGateway,
    account_id: &str,
    amount: Decimal,
) -> Result<PaymentReceipt, EngineError> {
    let receipt = gateway.charge(account_id, amount);
    if receipt.success {
        Ok(receipt)
    } else {
        Err(EngineError::PaymentFailed { amount })
    }
}
