use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_date, parse_decimal, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::enums::ExpenseCategory;
use crate::models::*;

const EXPENSE_COLUMNS: &str = "id, amount, category, description, expense_date, created_at, updated_at";

struct ExpenseRow {
    id: String,
    amount: String,
    category: String,
    description: Option<String>,
    expense_date: String,
    created_at: String,
    updated_at: String,
}

fn expense_row(row: &Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok(ExpenseRow {
        id: row.get(0)?,
        amount: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        expense_date: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn expense_from_row(row: ExpenseRow) -> Result<Expense, DatabaseError> {
    Ok(Expense {
        amount: parse_decimal("expenses.amount", &row.amount)?,
        category: ExpenseCategory::from_str(&row.category)?,
        expense_date: parse_date("expenses.expense_date", &row.expense_date)?,
        created_at: parse_timestamp("expenses.created_at", &row.created_at)?,
        updated_at: parse_timestamp("expenses.updated_at", &row.updated_at)?,
        id: row.id,
        description: row.description,
    })
}

pub fn insert_expense(conn: &Connection, expense: &Expense) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO expenses ({EXPENSE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            expense.id,
            expense.amount.to_string(),
            expense.category.as_str(),
            expense.description,
            expense.expense_date.to_string(),
            format_timestamp(&expense.created_at),
            format_timestamp(&expense.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_expense(conn: &Connection, id: &str) -> Result<Option<Expense>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
            params![id],
            expense_row,
        )
        .optional()?;
    row.map(expense_from_row).transpose()
}

/// Most recent expense date first.
pub fn list_expenses(conn: &Connection, filter: &ExpenseFilter) -> Result<Vec<Expense>, DatabaseError> {
    let mut sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    if let Some(category) = filter.category {
        sql.push_str(" WHERE category = ?1");
        params_vec.push(Box::new(category.as_str()));
    }
    sql.push_str(" ORDER BY expense_date DESC, created_at DESC, id");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), expense_row)?;

    let mut expenses = Vec::new();
    for row in rows {
        expenses.push(expense_from_row(row?)?);
    }
    Ok(expenses)
}

pub fn update_expense(conn: &Connection, expense: &Expense) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE expenses SET amount = ?2, category = ?3, description = ?4, expense_date = ?5,
         updated_at = ?6 WHERE id = ?1",
        params![
            expense.id,
            expense.amount.to_string(),
            expense.category.as_str(),
            expense.description,
            expense.expense_date.to_string(),
            format_timestamp(&expense.updated_at),
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_expense(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub fn expense_exists(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM expenses WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
