//! Receipts: a read-only projection of a payment record, or of a single
//! installment within it. Nothing is persisted; the same record and
//! installment number always yield the same receipt.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::enums::PaymentMethod;
use crate::models::{remaining_balance, Payment};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub clinic_name: String,
    pub receipt_number: String,
    pub payment_id: String,
    /// 1-based installment number for an installment receipt.
    pub transaction_number: Option<usize>,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub amount: Decimal,
    pub total_amount: Decimal,
    pub remaining_balance: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_method_label: String,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}

fn method_label(method: Option<PaymentMethod>) -> String {
    method.map_or("Not specified", |m| m.label()).to_string()
}

/// Build the receipt for `payment`, or for installment `transaction`
/// (1-based) when given.
pub fn build_receipt(
    clinic_name: &str,
    payment: &Payment,
    patient_phone: Option<&str>,
    transaction: Option<usize>,
) -> Result<Receipt, DatabaseError> {
    let Some(n) = transaction else {
        let date = payment
            .transactions
            .last()
            .map_or(payment.created_at, |t| t.created_at);
        return Ok(Receipt {
            clinic_name: clinic_name.to_string(),
            receipt_number: payment.id.clone(),
            payment_id: payment.id.clone(),
            transaction_number: None,
            patient_name: payment.patient_name.clone(),
            patient_phone: patient_phone.map(String::from),
            amount: payment.amount_paid,
            total_amount: payment.total_amount,
            remaining_balance: payment.remaining_balance,
            payment_method: payment.payment_method,
            payment_method_label: method_label(payment.payment_method),
            date,
            notes: payment.notes.clone(),
        });
    };

    let txn = n
        .checked_sub(1)
        .and_then(|idx| payment.transactions.get(idx))
        .ok_or_else(|| {
            DatabaseError::not_found("Transaction", &format!("{}-{n}", payment.id))
        })?;

    // Balance as it stood right after this installment.
    let paid_so_far: Decimal = payment.transactions[..n].iter().map(|t| t.amount).sum();
    let method = txn.payment_method.or(payment.payment_method);

    Ok(Receipt {
        clinic_name: clinic_name.to_string(),
        receipt_number: format!("{}-{n}", payment.id),
        payment_id: payment.id.clone(),
        transaction_number: Some(n),
        patient_name: payment.patient_name.clone(),
        patient_phone: patient_phone.map(String::from),
        amount: txn.amount,
        total_amount: payment.total_amount,
        remaining_balance: remaining_balance(payment.total_amount, paid_so_far),
        payment_method: method,
        payment_method_label: method_label(method),
        date: txn.created_at,
        notes: txn.notes.clone(),
    })
}

/// Plain-text rendering for printing.
pub fn render_text(receipt: &Receipt) -> String {
    let rule = "-".repeat(40);
    let mut out = String::new();
    let _ = writeln!(out, "{}", receipt.clinic_name);
    let _ = writeln!(out, "Payment Receipt");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Receipt #:    {}", receipt.receipt_number);
    let _ = writeln!(out, "Date:         {}", receipt.date.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Patient:      {}", receipt.patient_name);
    if let Some(phone) = &receipt.patient_phone {
        let _ = writeln!(out, "Phone:        {phone}");
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Amount paid:  {:.2}", receipt.amount);
    let _ = writeln!(out, "Total:        {:.2}", receipt.total_amount);
    let _ = writeln!(out, "Balance:      {:.2}", receipt.remaining_balance);
    let _ = writeln!(out, "Method:       {}", receipt.payment_method_label);
    if let Some(notes) = &receipt.notes {
        let _ = writeln!(out, "Notes:        {notes}");
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Thank you.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentTransaction;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn payment() -> Payment {
        let t = |d| Utc.with_ymd_and_hms(2026, 2, d, 10, 0, 0).unwrap();
        let mut p = Payment {
            id: "payment-7".into(),
            patient_id: "patient-1".into(),
            patient_name: "Khadar Ali".into(),
            total_amount: dec!(300),
            amount_paid: Decimal::ZERO,
            remaining_balance: Decimal::ZERO,
            payment_method: Some(PaymentMethod::Edahab),
            notes: Some("Crown".into()),
            transactions: vec![
                PaymentTransaction {
                    amount: dec!(100),
                    created_at: t(1),
                    payment_method: Some(PaymentMethod::Cash),
                    notes: None,
                },
                PaymentTransaction {
                    amount: dec!(50),
                    created_at: t(9),
                    payment_method: None,
                    notes: Some("second visit".into()),
                },
            ],
            created_at: t(1),
            updated_at: t(9),
        };
        p.recompute();
        p
    }

    #[test]
    fn record_receipt_reflects_current_totals() {
        let receipt = build_receipt("Clinic", &payment(), Some("063555"), None).unwrap();
        assert_eq!(receipt.receipt_number, "payment-7");
        assert_eq!(receipt.amount, dec!(150));
        assert_eq!(receipt.remaining_balance, dec!(150));
        assert_eq!(receipt.payment_method_label, "Edahab");
        assert_eq!(receipt.patient_phone.as_deref(), Some("063555"));
    }

    #[test]
    fn installment_receipt_uses_running_balance() {
        let first = build_receipt("Clinic", &payment(), None, Some(1)).unwrap();
        assert_eq!(first.receipt_number, "payment-7-1");
        assert_eq!(first.amount, dec!(100));
        assert_eq!(first.remaining_balance, dec!(200));
        assert_eq!(first.payment_method, Some(PaymentMethod::Cash));

        let second = build_receipt("Clinic", &payment(), None, Some(2)).unwrap();
        assert_eq!(second.remaining_balance, dec!(150));
        // Falls back to the record's method
        assert_eq!(second.payment_method_label, "Edahab");
        assert_eq!(second.notes.as_deref(), Some("second visit"));
    }

    #[test]
    fn out_of_range_installment_is_not_found() {
        for n in [0, 3] {
            let err = build_receipt("Clinic", &payment(), None, Some(n)).unwrap_err();
            assert!(matches!(err, DatabaseError::NotFound { .. }));
        }
    }

    #[test]
    fn receipt_is_idempotent() {
        let p = payment();
        assert_eq!(
            build_receipt("Clinic", &p, None, Some(2)).unwrap(),
            build_receipt("Clinic", &p, None, Some(2)).unwrap()
        );
    }

    #[test]
    fn text_rendering_contains_key_lines() {
        let receipt = build_receipt("Hargeisa Dental", &payment(), Some("063555"), None).unwrap();
        let text = render_text(&receipt);
        assert!(text.starts_with("Hargeisa Dental\n"));
        assert!(text.contains("Receipt #:    payment-7"));
        assert!(text.contains("Amount paid:  150.00"));
        assert!(text.contains("Phone:        063555"));
    }
}
