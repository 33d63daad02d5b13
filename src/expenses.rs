//! Clinic expenses.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::ExpenseCategory;
use crate::models::{check_amount, new_id, non_empty, Expense, ExpenseFilter};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    pub id: Option<String>,
    pub amount: Option<Decimal>,
    /// Unrecognised categories are filed under `other`.
    pub category: Option<String>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
}

/// Lenient category parse: anything unknown becomes `Other`.
pub fn parse_category(raw: &str) -> ExpenseCategory {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .unwrap_or_default()
}

pub fn list_expenses(
    conn: &Connection,
    category: Option<ExpenseCategory>,
) -> Result<Vec<Expense>, DatabaseError> {
    repository::list_expenses(conn, &ExpenseFilter { category })
}

pub fn get_expense(conn: &Connection, id: &str) -> Result<Expense, DatabaseError> {
    repository::get_expense(conn, id)?.ok_or_else(|| DatabaseError::not_found("Expense", id))
}

pub fn create_expense(conn: &Connection, input: ExpenseInput) -> Result<Expense, DatabaseError> {
    let amount = input
        .amount
        .ok_or_else(|| DatabaseError::ConstraintViolation("amount is required".into()))?;
    check_amount("amount", amount)?;

    let id = non_empty(input.id).unwrap_or_else(|| new_id("expense"));
    if repository::expense_exists(conn, &id)? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Expense with id {id} already exists"
        )));
    }

    let now = Utc::now();
    let expense = Expense {
        id,
        amount,
        category: input.category.as_deref().map(parse_category).unwrap_or_default(),
        description: non_empty(input.description),
        expense_date: input.expense_date.unwrap_or_else(|| now.date_naive()),
        created_at: now,
        updated_at: now,
    };
    repository::insert_expense(conn, &expense)?;
    tracing::info!(expense_id = %expense.id, category = %expense.category, "Expense recorded");
    Ok(expense)
}

pub fn update_expense(conn: &Connection, id: &str, input: ExpenseInput) -> Result<Expense, DatabaseError> {
    let mut expense = get_expense(conn, id)?;

    if let Some(amount) = input.amount {
        check_amount("amount", amount)?;
        expense.amount = amount;
    }
    if let Some(category) = input.category.as_deref() {
        expense.category = parse_category(category);
    }
    if input.description.is_some() {
        expense.description = non_empty(input.description);
    }
    if let Some(date) = input.expense_date {
        expense.expense_date = date;
    }

    expense.updated_at = Utc::now();
    if !repository::update_expense(conn, &expense)? {
        return Err(DatabaseError::not_found("Expense", id));
    }
    Ok(expense)
}

pub fn delete_expense(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    if !repository::delete_expense(conn, id)? {
        return Err(DatabaseError::not_found("Expense", id));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use rust_decimal_macros::dec;

    #[test]
    fn unknown_category_becomes_other() {
        assert_eq!(parse_category("Rent"), ExpenseCategory::Rent);
        assert_eq!(parse_category("travel"), ExpenseCategory::Other);
    }

    #[test]
    fn create_defaults_date_and_category() {
        let conn = open_memory_database().unwrap();
        let expense = create_expense(&conn, ExpenseInput {
            amount: Some(dec!(45)),
            category: Some("snacks".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(expense.category, ExpenseCategory::Other);
        assert_eq!(expense.expense_date, expense.created_at.date_naive());
    }

    #[test]
    fn negative_amount_rejected() {
        let conn = open_memory_database().unwrap();
        let err = create_expense(&conn, ExpenseInput {
            amount: Some(dec!(-1)),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn oversized_amount_rejected() {
        let conn = open_memory_database().unwrap();
        let err = create_expense(&conn, ExpenseInput {
            amount: Some(Decimal::MAX),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn zero_amount_accepted_and_updated() {
        let conn = open_memory_database().unwrap();
        let expense = create_expense(&conn, ExpenseInput {
            amount: Some(Decimal::ZERO),
            category: Some("utilities".into()),
            ..Default::default()
        })
        .unwrap();
        let updated = update_expense(&conn, &expense.id, ExpenseInput {
            amount: Some(dec!(310.75)),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(updated.amount, dec!(310.75));
        assert_eq!(updated.category, ExpenseCategory::Utilities);
    }
}
