use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::PaymentMethod;

/// One installment recorded against a payment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub remaining_balance: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// Ordered oldest first. Empty for records created without installments.
    #[serde(default)]
    pub transactions: Vec<PaymentTransaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `max(0, total - paid)`.
pub fn remaining_balance(total_amount: Decimal, amount_paid: Decimal) -> Decimal {
    (total_amount - amount_paid).max(Decimal::ZERO)
}

impl Payment {
    /// Re-derive `amount_paid` (when installments exist) and the clamped balance.
    pub fn recompute(&mut self) {
        if !self.transactions.is_empty() {
            self.amount_paid = self.transactions.iter().map(|t| t.amount).sum();
        }
        self.remaining_balance = remaining_balance(self.total_amount, self.amount_paid);
    }

    pub fn has_balance(&self) -> bool {
        self.remaining_balance > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment(total: Decimal, paid: Decimal) -> Payment {
        let now = Utc::now();
        Payment {
            id: "payment-1".into(),
            patient_id: "patient-1".into(),
            patient_name: "Amina".into(),
            total_amount: total,
            amount_paid: paid,
            remaining_balance: Decimal::ZERO,
            payment_method: None,
            notes: None,
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn remaining_balance_clamps_at_zero() {
        assert_eq!(remaining_balance(dec!(100), dec!(40)), dec!(60));
        assert_eq!(remaining_balance(dec!(100), dec!(140)), dec!(0));
    }

    #[test]
    fn recompute_sums_transactions() {
        let mut p = payment(dec!(300), dec!(0));
        for amount in [dec!(100), dec!(50.5)] {
            p.transactions.push(PaymentTransaction {
                amount,
                created_at: Utc::now(),
                payment_method: Some(PaymentMethod::Zaad),
                notes: None,
            });
        }
        p.recompute();
        assert_eq!(p.amount_paid, dec!(150.5));
        assert_eq!(p.remaining_balance, dec!(149.5));
        assert!(p.has_balance());
    }

    #[test]
    fn recompute_without_transactions_keeps_amount_paid() {
        let mut p = payment(dec!(80), dec!(100));
        p.recompute();
        assert_eq!(p.amount_paid, dec!(100));
        assert_eq!(p.remaining_balance, dec!(0));
        assert!(!p.has_balance());
    }
}
