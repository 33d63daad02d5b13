use std::collections::HashMap;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_decimal, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::PaymentMethod;
use crate::models::*;

const PAYMENT_COLUMNS: &str = "id, patient_id, patient_name, total_amount, amount_paid,
    remaining_balance, payment_method, notes, created_at, updated_at";

struct PaymentRow {
    id: String,
    patient_id: String,
    patient_name: String,
    total_amount: String,
    amount_paid: String,
    remaining_balance: String,
    payment_method: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

fn payment_row(row: &Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        total_amount: row.get(3)?,
        amount_paid: row.get(4)?,
        remaining_balance: row.get(5)?,
        payment_method: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn parse_method(raw: Option<String>) -> Result<Option<PaymentMethod>, DatabaseError> {
    raw.map(|m| PaymentMethod::from_str(&m)).transpose()
}

fn payment_from_row(
    row: PaymentRow,
    transactions: Vec<PaymentTransaction>,
) -> Result<Payment, DatabaseError> {
    Ok(Payment {
        total_amount: parse_decimal("payments.total_amount", &row.total_amount)?,
        amount_paid: parse_decimal("payments.amount_paid", &row.amount_paid)?,
        remaining_balance: parse_decimal("payments.remaining_balance", &row.remaining_balance)?,
        payment_method: parse_method(row.payment_method)?,
        created_at: parse_timestamp("payments.created_at", &row.created_at)?,
        updated_at: parse_timestamp("payments.updated_at", &row.updated_at)?,
        id: row.id,
        patient_id: row.patient_id,
        patient_name: row.patient_name,
        notes: row.notes,
        transactions,
    })
}

struct TransactionRow {
    payment_id: String,
    amount: String,
    payment_method: Option<String>,
    notes: Option<String>,
    created_at: String,
}

fn transaction_row(row: &Row<'_>) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        payment_id: row.get(0)?,
        amount: row.get(1)?,
        payment_method: row.get(2)?,
        notes: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<(String, PaymentTransaction), DatabaseError> {
    let txn = PaymentTransaction {
        amount: parse_decimal("payment_transactions.amount", &row.amount)?,
        created_at: parse_timestamp("payment_transactions.created_at", &row.created_at)?,
        payment_method: parse_method(row.payment_method)?,
        notes: row.notes,
    };
    Ok((row.payment_id, txn))
}

fn transactions_for(conn: &Connection, payment_id: &str) -> Result<Vec<PaymentTransaction>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT payment_id, amount, payment_method, notes, created_at
         FROM payment_transactions WHERE payment_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map(params![payment_id], transaction_row)?;

    let mut txns = Vec::new();
    for row in rows {
        txns.push(transaction_from_row(row?)?.1);
    }
    Ok(txns)
}

/// All installments grouped by payment id, each list in insertion order.
fn all_transactions(conn: &Connection) -> Result<HashMap<String, Vec<PaymentTransaction>>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT payment_id, amount, payment_method, notes, created_at
         FROM payment_transactions ORDER BY payment_id, seq",
    )?;
    let rows = stmt.query_map([], transaction_row)?;

    let mut grouped: HashMap<String, Vec<PaymentTransaction>> = HashMap::new();
    for row in rows {
        let (payment_id, txn) = transaction_from_row(row?)?;
        grouped.entry(payment_id).or_default().push(txn);
    }
    Ok(grouped)
}

fn write_transactions(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM payment_transactions WHERE payment_id = ?1",
        params![payment.id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO payment_transactions (payment_id, seq, amount, payment_method, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (seq, txn) in payment.transactions.iter().enumerate() {
        stmt.execute(params![
            payment.id,
            seq as i64,
            txn.amount.to_string(),
            txn.payment_method.map(|m| m.as_str()),
            txn.notes,
            format_timestamp(&txn.created_at),
        ])?;
    }
    Ok(())
}

/// Insert the record and its installments. Callers wanting atomicity
/// pass a `rusqlite::Transaction` (it derefs to `Connection`).
pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            payment.id,
            payment.patient_id,
            payment.patient_name,
            payment.total_amount.to_string(),
            payment.amount_paid.to_string(),
            payment.remaining_balance.to_string(),
            payment.payment_method.map(|m| m.as_str()),
            payment.notes,
            format_timestamp(&payment.created_at),
            format_timestamp(&payment.updated_at),
        ],
    )?;
    write_transactions(conn, payment)
}

pub fn get_payment(conn: &Connection, id: &str) -> Result<Option<Payment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
            params![id],
            payment_row,
        )
        .optional()?;
    match row {
        Some(row) => {
            let txns = transactions_for(conn, &row.id)?;
            Ok(Some(payment_from_row(row, txns)?))
        }
        None => Ok(None),
    }
}

fn collect_payments(
    conn: &Connection,
    sql: &str,
    params_vec: Vec<Box<dyn rusqlite::types::ToSql>>,
) -> Result<Vec<Payment>, DatabaseError> {
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), payment_row)?;
    let mut raw = Vec::new();
    for row in rows {
        raw.push(row?);
    }
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut txns = all_transactions(conn)?;
    raw.into_iter()
        .map(|row| {
            let list = txns.remove(&row.id).unwrap_or_default();
            payment_from_row(row, list)
        })
        .collect()
}

/// Newest first. `patient_id` wins over `search` when both are given.
pub fn list_payments(conn: &Connection, filter: &PaymentFilter) -> Result<Vec<Payment>, DatabaseError> {
    let mut sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    let patient_id = filter.patient_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if let Some(patient_id) = patient_id {
        sql.push_str(" WHERE patient_id = ?1");
        params_vec.push(Box::new(patient_id.to_string()));
    } else if let Some(term) = search {
        sql.push_str(
            " WHERE LOWER(patient_name) LIKE LOWER(?1)
              OR patient_id IN (SELECT id FROM patients WHERE phone LIKE ?1)",
        );
        params_vec.push(Box::new(format!("%{term}%")));
    }
    sql.push_str(" ORDER BY created_at DESC, id");

    collect_payments(conn, &sql, params_vec)
}

/// A patient's records in ledger order: oldest first, ties broken by id.
pub fn list_patient_payments(conn: &Connection, patient_id: &str) -> Result<Vec<Payment>, DatabaseError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE patient_id = ?1 ORDER BY created_at, id"
    );
    collect_payments(conn, &sql, vec![Box::new(patient_id.to_string())])
}

/// Overwrite the record row only; its installments are left as stored.
pub fn update_payment_row(conn: &Connection, payment: &Payment) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE payments SET patient_id = ?2, patient_name = ?3, total_amount = ?4,
         amount_paid = ?5, remaining_balance = ?6, payment_method = ?7, notes = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            payment.id,
            payment.patient_id,
            payment.patient_name,
            payment.total_amount.to_string(),
            payment.amount_paid.to_string(),
            payment.remaining_balance.to_string(),
            payment.payment_method.map(|m| m.as_str()),
            payment.notes,
            format_timestamp(&payment.updated_at),
        ],
    )?;
    Ok(changed > 0)
}

/// Overwrite the record and replace its installment list. Run it inside a
/// transaction that also covered the read, or concurrent appends are lost.
pub fn update_payment(conn: &Connection, payment: &Payment) -> Result<bool, DatabaseError> {
    if !update_payment_row(conn, payment)? {
        return Ok(false);
    }
    write_transactions(conn, payment)?;
    Ok(true)
}

/// Installments go with the record (ON DELETE CASCADE).
pub fn delete_payment(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM payments WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn payment_exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
