//! Repository layer: collection-scoped database operations.
//!
//! One sub-module per collection; every public function takes a plain
//! `&Connection` so callers can pass a `rusqlite::Transaction` when they
//! need several statements to commit together.

mod appointment;
mod doctor;
mod expense;
mod patient;
mod payment;

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;

use super::DatabaseError;

pub use appointment::*;
pub use doctor::*;
pub use expense::*;
pub use patient::*;
pub use payment::*;

/// Fixed-width RFC 3339 so TEXT ordering matches chronological ordering.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid(column, raw))
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid(column, raw))
}

pub(crate) fn parse_optional_date(
    column: &str,
    raw: Option<String>,
) -> Result<Option<NaiveDate>, DatabaseError> {
    raw.map(|d| parse_date(column, &d)).transpose()
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(raw).map_err(|_| invalid(column, raw))
}

fn invalid(column: &str, raw: &str) -> DatabaseError {
    DatabaseError::InvalidValue {
        column: column.to_string(),
        value: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::*;
    use crate::models::*;
    use chrono::{Duration, TimeZone};
    use rusqlite::{params, Connection};
    use rust_decimal_macros::dec;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap()
    }

    fn make_patient(conn: &Connection, id: &str, name: &str, phone: &str, day: u32) -> Patient {
        let patient = Patient {
            id: id.into(),
            name: name.into(),
            email: Some(format!("{id}@example.com")),
            phone: phone.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
            gender: Gender::Female,
            address: "Hargeisa".into(),
            medical_history: None,
            allergies: Some("Penicillin".into()),
            doctor_id: None,
            doctor_name: None,
            total_due: dec!(250.00),
            created_at: ts(day),
            updated_at: ts(day),
        };
        insert_patient(conn, &patient).unwrap();
        patient
    }

    fn make_payment(patient: &Patient, id: &str, total: Decimal, day: u32) -> Payment {
        Payment {
            id: id.into(),
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            total_amount: total,
            amount_paid: Decimal::ZERO,
            remaining_balance: total,
            payment_method: None,
            notes: None,
            transactions: Vec::new(),
            created_at: ts(day),
            updated_at: ts(day),
        }
    }

    #[test]
    fn timestamp_text_round_trips() {
        let original = ts(4) + Duration::microseconds(1234);
        let text = format_timestamp(&original);
        assert_eq!(parse_timestamp("t", &text).unwrap(), original);
    }

    #[test]
    fn corrupt_decimal_surfaces_invalid_value() {
        let conn = test_db();
        let patient = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        conn.execute(
            "UPDATE patients SET total_due = 'lots' WHERE id = ?1",
            params![patient.id],
        )
        .unwrap();
        let err = get_patient(&conn, "patient-1").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidValue { .. }));
    }

    #[test]
    fn patient_insert_and_retrieve() {
        let conn = test_db();
        let patient = make_patient(&conn, "patient-1", "Amina Yusuf", "063111", 1);
        let loaded = get_patient(&conn, "patient-1").unwrap().unwrap();
        assert_eq!(loaded, patient);
        assert!(get_patient(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn patient_search_matches_name_phone_and_email() {
        let conn = test_db();
        make_patient(&conn, "patient-1", "Amina Yusuf", "063111", 1);
        make_patient(&conn, "patient-2", "Hodan Ali", "065222", 2);

        let by_name = list_patients(&conn, &PatientFilter { search: Some("amina".into()) }).unwrap();
        assert_eq!(by_name.len(), 1);
        let by_phone = list_patients(&conn, &PatientFilter { search: Some("5222".into()) }).unwrap();
        assert_eq!(by_phone[0].id, "patient-2");
        let by_email = list_patients(&conn, &PatientFilter { search: Some("PATIENT-1@".into()) }).unwrap();
        assert_eq!(by_email[0].id, "patient-1");

        // Newest first without a filter
        let all = list_patients(&conn, &PatientFilter::default()).unwrap();
        assert_eq!(all[0].id, "patient-2");
    }

    #[test]
    fn patient_email_uniqueness_check_excludes_self() {
        let conn = test_db();
        make_patient(&conn, "patient-1", "Amina", "063111", 1);
        assert!(patient_email_taken(&conn, "PATIENT-1@example.com", None).unwrap());
        assert!(!patient_email_taken(&conn, "patient-1@example.com", Some("patient-1")).unwrap());
    }

    #[test]
    fn find_by_phone_returns_oldest_match() {
        let conn = test_db();
        make_patient(&conn, "patient-b", "Second", "063999", 5);
        make_patient(&conn, "patient-a", "First", "063999", 2);
        let found = find_patient_by_phone(&conn, "063999").unwrap().unwrap();
        assert_eq!(found.id, "patient-a");
        assert!(find_patient_by_phone(&conn, "000").unwrap().is_none());
    }

    #[test]
    fn patient_update_and_delete() {
        let conn = test_db();
        let mut patient = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        patient.name = "Amina Y.".into();
        assert!(update_patient(&conn, &patient).unwrap());
        assert_eq!(get_patient(&conn, "patient-1").unwrap().unwrap().name, "Amina Y.");

        assert!(delete_patient(&conn, "patient-1").unwrap());
        assert!(!delete_patient(&conn, "patient-1").unwrap());
        assert_eq!(count_patients(&conn).unwrap(), 0);
    }

    #[test]
    fn doctors_listed_alphabetically() {
        let conn = test_db();
        for (id, name) in [("doctor-1", "zahra"), ("doctor-2", "Abdi")] {
            insert_doctor(&conn, &Doctor {
                id: id.into(),
                name: name.into(),
                email: None,
                phone: "063".into(),
                specialization: Some("Dentistry".into()),
                created_at: ts(1),
                updated_at: ts(1),
            })
            .unwrap();
        }
        let doctors = list_doctors(&conn).unwrap();
        assert_eq!(doctors[0].name, "Abdi");
        assert!(doctor_exists(&conn, "doctor-1").unwrap());
    }

    #[test]
    fn appointment_filters_by_date_and_status() {
        let conn = test_db();
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        for (id, date, slot, status) in [
            ("appt-1", day, "10:00", AppointmentStatus::Scheduled),
            ("appt-2", day, "09:00", AppointmentStatus::Completed),
            ("appt-3", day.succ_opt().unwrap(), "08:00", AppointmentStatus::Scheduled),
        ] {
            insert_appointment(&conn, &Appointment {
                id: id.into(),
                patient_id: "patient-1".into(),
                patient_name: "Amina".into(),
                appointment_date: date,
                time_slot: slot.into(),
                status,
                notes: None,
                treatment_type: Some("Cleaning".into()),
                created_at: ts(1),
                updated_at: ts(1),
            })
            .unwrap();
        }

        let on_day = list_appointments(&conn, &AppointmentFilter {
            date: Some(day),
            ..Default::default()
        })
        .unwrap();
        let ids: Vec<_> = on_day.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["appt-2", "appt-1"]);

        let scheduled = list_appointments(&conn, &AppointmentFilter {
            status: Some(AppointmentStatus::Scheduled),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(scheduled.len(), 2);
    }

    #[test]
    fn payment_round_trips_with_transactions() {
        let conn = test_db();
        let patient = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        let mut payment = make_payment(&patient, "payment-1", dec!(300), 2);
        payment.payment_method = Some(PaymentMethod::Zaad);
        payment.transactions = vec![
            PaymentTransaction {
                amount: dec!(100),
                created_at: ts(2),
                payment_method: Some(PaymentMethod::Zaad),
                notes: Some("first".into()),
            },
            PaymentTransaction {
                amount: dec!(50),
                created_at: ts(3),
                payment_method: None,
                notes: None,
            },
        ];
        payment.recompute();
        insert_payment(&conn, &payment).unwrap();

        let loaded = get_payment(&conn, "payment-1").unwrap().unwrap();
        assert_eq!(loaded, payment);
        assert_eq!(loaded.amount_paid, dec!(150));
        assert_eq!(loaded.remaining_balance, dec!(150));
    }

    #[test]
    fn payment_search_by_name_or_phone() {
        let conn = test_db();
        let amina = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        let hodan = make_patient(&conn, "patient-2", "Hodan", "065222", 1);
        insert_payment(&conn, &make_payment(&amina, "payment-1", dec!(10), 2)).unwrap();
        insert_payment(&conn, &make_payment(&hodan, "payment-2", dec!(20), 3)).unwrap();

        let by_phone = list_payments(&conn, &PaymentFilter {
            search: Some("5222".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id, "payment-2");

        let by_patient = list_payments(&conn, &PaymentFilter {
            patient_id: Some("patient-1".into()),
            search: Some("Hodan".into()),
        })
        .unwrap();
        assert_eq!(by_patient[0].id, "payment-1");

        let all = list_payments(&conn, &PaymentFilter::default()).unwrap();
        assert_eq!(all[0].id, "payment-2");
    }

    #[test]
    fn patient_payments_in_ledger_order() {
        let conn = test_db();
        let patient = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        insert_payment(&conn, &make_payment(&patient, "payment-b", dec!(10), 4)).unwrap();
        insert_payment(&conn, &make_payment(&patient, "payment-a", dec!(10), 2)).unwrap();
        let ledger = list_patient_payments(&conn, "patient-1").unwrap();
        let ids: Vec<_> = ledger.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["payment-a", "payment-b"]);
    }

    #[test]
    fn deleting_payment_removes_transactions() {
        let conn = test_db();
        let patient = make_patient(&conn, "patient-1", "Amina", "063111", 1);
        let mut payment = make_payment(&patient, "payment-1", dec!(100), 2);
        payment.transactions.push(PaymentTransaction {
            amount: dec!(40),
            created_at: ts(2),
            payment_method: Some(PaymentMethod::Cash),
            notes: None,
        });
        payment.recompute();
        insert_payment(&conn, &payment).unwrap();

        assert!(delete_payment(&conn, "payment-1").unwrap());
        let leftover: i64 = conn
            .query_row("SELECT COUNT(*) FROM payment_transactions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn expenses_filtered_by_category() {
        let conn = test_db();
        for (id, category, day) in [
            ("expense-1", ExpenseCategory::Rent, 1),
            ("expense-2", ExpenseCategory::Supplies, 5),
        ] {
            insert_expense(&conn, &Expense {
                id: id.into(),
                amount: dec!(75.25),
                category,
                description: None,
                expense_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                created_at: ts(day),
                updated_at: ts(day),
            })
            .unwrap();
        }
        let rent = list_expenses(&conn, &ExpenseFilter { category: Some(ExpenseCategory::Rent) }).unwrap();
        assert_eq!(rent.len(), 1);
        assert_eq!(rent[0].amount, dec!(75.25));

        let all = list_expenses(&conn, &ExpenseFilter::default()).unwrap();
        assert_eq!(all[0].id, "expense-2");
    }
}
