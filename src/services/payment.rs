use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PaymentReceipt {
    pub success: bool,
    pub amount: Decimal,
    pub reference: Option<String>,
}

impl PaymentReceipt {
    pub fn approved(amount: Decimal) -> Self {
        Self {
            success: true,
            amount,
            reference: Some(format!("pay_{}", Uuid::new_v4().simple())),
        }
    }

    pub fn declined(amount: Decimal) -> Self {
        Self {
            success: false,
            amount,
            reference: None,
        }
    }
}

/// Synchronous charge against whatever stands in for a payment provider.
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, account_id: &str, amount: Decimal) -> PaymentReceipt;

    /// Releases an approved charge whose effect could not be recorded.
    fn refund(&self, account_id: &str, receipt: &PaymentReceipt);
}

/// Test-mode gateway: approves everything except a random share of charges.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    failure_rate: f64,
}

impl MockPaymentGateway {
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn always_approve() -> Self {
        Self::new(0.0)
    }

    pub fn always_decline() -> Self {
        Self::new(1.0)
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn charge(&self, account_id: &str, amount: Decimal) -> PaymentReceipt {
        let declined = rand::rng().random_bool(self.failure_rate);

        if declined {
            tracing::warn!(
                "Mock charge of {} declined for account {}",
                amount,
                account_id.chars().take(8).collect::<String>()
            );
            PaymentReceipt::declined(amount)
        } else {
            PaymentReceipt::approved(amount)
        }
    }

    fn refund(&self, account_id: &str, receipt: &PaymentReceipt) {
        tracing::info!(
            "Mock refund of {} ({}) for account {}",
            receipt.amount,
            receipt.reference.as_deref().unwrap_or("no reference"),
            account_id.chars().take(8).collect::<String>()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_are_deterministic() {
        for _ in 0..50 {
            assert!(MockPaymentGateway::always_approve().charge("a", Decimal::TEN).success);
            assert!(!MockPaymentGateway::always_decline().charge("a", Decimal::TEN).success);
        }
    }

    #[test]
    fn approved_charges_carry_a_reference() {
        let receipt = MockPaymentGateway::always_approve().charge("a", Decimal::from(70));

        assert_eq!(receipt.amount, Decimal::from(70));
        assert!(receipt.reference.unwrap().starts_with("pay_"));
    }
}
