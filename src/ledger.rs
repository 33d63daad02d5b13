//! Payment ledger: a patient's payment records, the installments recorded
//! against them, and the running balance.
//!
//! Every write path re-derives `remainingBalance = max(0, total - paid)`
//! through [`Payment::recompute`]. Appends are read-modify-write and run
//! inside an `IMMEDIATE` SQLite transaction so concurrent installments on
//! the same record serialise instead of overwriting each other.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::PaymentMethod;
use crate::models::{
    check_amount, new_id, non_empty, required, Patient, Payment, PaymentFilter, PaymentTransaction,
};

/// Note attached to the synthetic installment that carries a legacy
/// `amountPaid` forward once a record starts receiving installments.
const OPENING_NOTE: &str = "Opening balance";

// ═══════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════

/// One installment to record for a patient (`POST /api/patients/:id/payments`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// Total for a freshly opened record; defaults to the patient's `totalDue`.
    pub total_amount: Option<Decimal>,
    /// Open a new record even when an existing one could take the installment.
    #[serde(default)]
    pub new_record: bool,
    /// Explicit target record, bypassing the selection rule.
    pub payment_id: Option<String>,
}

/// Body of `POST /api/payments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub total_amount: Option<Decimal>,
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// Backdates the record and its first installment (spreadsheet imports).
    pub payment_date: Option<NaiveDate>,
    /// Append `amountPaid` as an installment on this record instead of creating one.
    pub add_to_payment_id: Option<String>,
    /// Note for the first installment; set by spreadsheet imports.
    #[serde(skip)]
    pub opening_note: Option<String>,
}

impl NewPayment {
    pub fn to_entry(&self) -> PaymentEntry {
        PaymentEntry {
            amount: self.amount_paid.unwrap_or(Decimal::ZERO),
            payment_method: self.payment_method,
            notes: self.notes.clone(),
            ..Default::default()
        }
    }
}

/// Body of `PUT /api/payments/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub patient_name: Option<String>,
    pub total_amount: Option<Decimal>,
    /// Only accepted on records without installments.
    pub amount_paid: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Views
// ═══════════════════════════════════════════════════════════

/// A payment row in `GET /api/payments`, decorated with the patient's phone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListItem {
    #[serde(flatten)]
    pub payment: Payment,
    pub patient_phone: Option<String>,
}

/// Summary of every record held by one patient.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientLedger {
    pub patient_id: String,
    pub patient_name: String,
    pub total_due: Decimal,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
    pub payments: Vec<Payment>,
}

// ═══════════════════════════════════════════════════════════
// Pure ledger rules
// ═══════════════════════════════════════════════════════════

/// Target for a new installment: the first record still owing money,
/// else the first record. `ledger` must be in ledger order.
pub fn select_target(ledger: &[Payment]) -> Option<&Payment> {
    ledger
        .iter()
        .find(|p| p.has_balance())
        .or_else(|| ledger.first())
}

/// Append an installment and re-derive the totals.
///
/// A legacy record (paid amount but no installment history) first gets a
/// synthetic opening installment so the paid sum is preserved.
pub fn apply_transaction(payment: &mut Payment, txn: PaymentTransaction) {
    if payment.transactions.is_empty() && payment.amount_paid > Decimal::ZERO {
        payment.transactions.push(PaymentTransaction {
            amount: payment.amount_paid,
            created_at: payment.created_at,
            payment_method: payment.payment_method,
            notes: Some(OPENING_NOTE.to_string()),
        });
    }
    if txn.payment_method.is_some() {
        payment.payment_method = txn.payment_method;
    }
    payment.updated_at = txn.created_at;
    payment.transactions.push(txn);
    payment.recompute();
}

fn check_positive(amount: Decimal) -> Result<(), DatabaseError> {
    if amount <= Decimal::ZERO {
        return Err(DatabaseError::ConstraintViolation(
            "Payment amount must be greater than zero".into(),
        ));
    }
    check_amount("amount", amount)
}

fn entry_transaction(entry: &PaymentEntry, at: DateTime<Utc>) -> PaymentTransaction {
    PaymentTransaction {
        amount: entry.amount,
        created_at: at,
        payment_method: entry.payment_method,
        notes: non_empty(entry.notes.clone()),
    }
}

// ═══════════════════════════════════════════════════════════
// Queries
// ═══════════════════════════════════════════════════════════

pub fn list_payments(conn: &Connection, filter: &PaymentFilter) -> Result<Vec<PaymentListItem>, DatabaseError> {
    let payments = repository::list_payments(conn, filter)?;
    let phones = repository::patient_phone_map(conn)?;
    Ok(payments
        .into_iter()
        .map(|payment| PaymentListItem {
            patient_phone: phones.get(&payment.patient_id).cloned(),
            payment,
        })
        .collect())
}

pub fn get_payment(conn: &Connection, id: &str) -> Result<Payment, DatabaseError> {
    repository::get_payment(conn, id)?.ok_or_else(|| DatabaseError::not_found("Payment", id))
}

pub fn patient_ledger(conn: &Connection, patient_id: &str) -> Result<PatientLedger, DatabaseError> {
    let patient = repository::get_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("Patient", patient_id))?;
    let payments = repository::list_patient_payments(conn, patient_id)?;

    let total_amount = payments.iter().map(|p| p.total_amount).sum();
    let total_paid = payments.iter().map(|p| p.amount_paid).sum();
    let remaining_balance = payments.iter().map(|p| p.remaining_balance).sum();

    Ok(PatientLedger {
        patient_id: patient.id,
        patient_name: patient.name,
        total_due: patient.total_due,
        total_amount,
        total_paid,
        remaining_balance,
        payments,
    })
}

// ═══════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════

/// Record an installment for a patient.
///
/// Opens a fresh record when the patient has none or `new_record` is set;
/// otherwise appends to `payment_id` when given, else to the record chosen
/// by [`select_target`].
pub fn record_payment(
    conn: &mut Connection,
    patient_id: &str,
    entry: &PaymentEntry,
) -> Result<Payment, DatabaseError> {
    check_positive(entry.amount)?;
    if let Some(total) = entry.total_amount {
        check_amount("totalAmount", total)?;
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let patient = repository::get_patient(&tx, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("Patient", patient_id))?;

    let target = match entry.payment_id.as_deref() {
        Some(payment_id) => {
            let payment = repository::get_payment(&tx, payment_id)?
                .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))?;
            if payment.patient_id != patient.id {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "Payment {payment_id} does not belong to patient {patient_id}"
                )));
            }
            Some(payment)
        }
        None if entry.new_record => None,
        None => {
            let ledger = repository::list_patient_payments(&tx, patient_id)?;
            select_target(&ledger).cloned()
        }
    };

    let now = Utc::now();
    let payment = match target {
        Some(mut payment) => {
            apply_transaction(&mut payment, entry_transaction(entry, now));
            repository::update_payment(&tx, &payment)?;
            payment
        }
        None => {
            let payment = open_record(&patient, entry, now);
            repository::insert_payment(&tx, &payment)?;
            payment
        }
    };
    tx.commit()?;

    tracing::info!(
        patient_id = %patient.id,
        payment_id = %payment.id,
        installments = payment.transactions.len(),
        "Payment recorded"
    );
    Ok(payment)
}

fn open_record(patient: &Patient, entry: &PaymentEntry, now: DateTime<Utc>) -> Payment {
    let mut payment = Payment {
        id: new_id("payment"),
        patient_id: patient.id.clone(),
        patient_name: patient.name.clone(),
        total_amount: entry.total_amount.unwrap_or(patient.total_due),
        amount_paid: Decimal::ZERO,
        remaining_balance: Decimal::ZERO,
        payment_method: None,
        notes: None,
        transactions: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    apply_transaction(&mut payment, entry_transaction(entry, now));
    payment
}

/// Append an installment to an explicit record.
pub fn add_to_payment(
    conn: &mut Connection,
    payment_id: &str,
    entry: &PaymentEntry,
) -> Result<Payment, DatabaseError> {
    check_positive(entry.amount)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut payment = repository::get_payment(&tx, payment_id)?
        .ok_or_else(|| DatabaseError::not_found("Payment", payment_id))?;
    apply_transaction(&mut payment, entry_transaction(entry, Utc::now()));
    repository::update_payment(&tx, &payment)?;
    tx.commit()?;

    tracing::info!(payment_id = %payment.id, "Installment added");
    Ok(payment)
}

/// Create a record directly. A positive `amountPaid` becomes its first
/// installment; `totalAmount` defaults to the paid amount.
pub fn create_payment(conn: &mut Connection, input: NewPayment) -> Result<Payment, DatabaseError> {
    let patient_id = required("patientId", input.patient_id)?;
    let amount_paid = input.amount_paid.unwrap_or(Decimal::ZERO);
    check_amount("amountPaid", amount_paid)?;
    let total_amount = input.total_amount.unwrap_or(amount_paid);
    check_amount("totalAmount", total_amount)?;

    let id = non_empty(input.id).unwrap_or_else(|| new_id("payment"));
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if repository::payment_exists(&tx, &id)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Payment with id {id} already exists"
        )));
    }

    let patient_name = match non_empty(input.patient_name) {
        Some(name) => name,
        None => repository::get_patient(&tx, &patient_id)?
            .map(|p| p.name)
            .ok_or_else(|| DatabaseError::ConstraintViolation("patientName is required".into()))?,
    };

    let now = Utc::now();
    let created_at = input
        .payment_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now);

    let mut payment = Payment {
        id,
        patient_id,
        patient_name,
        total_amount,
        amount_paid: Decimal::ZERO,
        remaining_balance: Decimal::ZERO,
        payment_method: input.payment_method,
        notes: non_empty(input.notes),
        transactions: Vec::new(),
        created_at,
        updated_at: now,
    };
    if amount_paid > Decimal::ZERO {
        payment.transactions.push(PaymentTransaction {
            amount: amount_paid,
            created_at,
            payment_method: input.payment_method,
            notes: input.opening_note,
        });
    }
    payment.recompute();

    repository::insert_payment(&tx, &payment)?;
    tx.commit()?;
    tracing::info!(payment_id = %payment.id, patient_id = %payment.patient_id, "Payment created");
    Ok(payment)
}

/// Partial update; the balance is always re-derived.
///
/// Only the record row is written. The installment list never changes here,
/// so an append committed by another connection is never overwritten.
pub fn update_payment(conn: &mut Connection, id: &str, input: PaymentUpdate) -> Result<Payment, DatabaseError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut payment = get_payment(&tx, id)?;

    if let Some(name) = input.patient_name {
        payment.patient_name = required("patientName", Some(name))?;
    }
    if let Some(total) = input.total_amount {
        check_amount("totalAmount", total)?;
        payment.total_amount = total;
    }
    if let Some(paid) = input.amount_paid {
        if !payment.transactions.is_empty() && paid != payment.amount_paid {
            return Err(DatabaseError::ConstraintViolation(
                "amountPaid is derived from installments on this record; add a payment instead"
                    .into(),
            ));
        }
        check_amount("amountPaid", paid)?;
        payment.amount_paid = paid;
    }
    if input.payment_method.is_some() {
        payment.payment_method = input.payment_method;
    }
    if input.notes.is_some() {
        payment.notes = non_empty(input.notes);
    }

    payment.recompute();
    payment.updated_at = Utc::now();
    if !repository::update_payment_row(&tx, &payment)? {
        return Err(DatabaseError::not_found("Payment", id));
    }
    tx.commit()?;
    Ok(payment)
}

pub fn delete_payment(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    if !repository::delete_payment(conn, id)? {
        return Err(DatabaseError::not_found("Payment", id));
    }
    tracing::info!(payment_id = %id, "Payment deleted");
    Ok(())
}
