//! Financial and operational reports.
//!
//! Every aggregate is a pure reducer over in-memory slices so it can be
//! tested without a database; the `*_report` functions at the bottom load
//! the collections and assemble the response bodies.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, ExpenseCategory, PaymentMethod};
use crate::models::{Appointment, AppointmentFilter, Expense, ExpenseFilter, Payment, PaymentFilter};

pub const DEFAULT_MONTHS: u32 = 6;
pub const MAX_MONTHS: u32 = 24;
pub const DEFAULT_TOP: usize = 10;
const UPCOMING_DAYS: i64 = 7;
const UPCOMING_LIMIT: usize = 15;

// ═══════════════════════════════════════════════════════════
// Report rows
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRevenue {
    /// `YYYY-MM`
    pub month: String,
    /// Short display label, e.g. `Mar 26`.
    pub label: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodBucket {
    pub method: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingEntry {
    pub payment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub remaining_balance: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingBalances {
    /// Sum over the returned rows.
    pub total: Decimal,
    pub count: usize,
    pub top_patients: Vec<OutstandingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub label: &'static str,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOverview {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueInsights {
    pub this_month_revenue: Decimal,
    pub last_month_revenue: Decimal,
    pub change_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingAppointment {
    pub id: String,
    pub patient_name: String,
    pub appointment_date: NaiveDate,
    pub time_slot: String,
    pub treatment_type: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Reducers
// ═══════════════════════════════════════════════════════════

/// Money received on a record, dated. Installments count on their own
/// dates; a record without installments counts `amountPaid` at creation.
fn revenue_events(payment: &Payment) -> Vec<(DateTime<Utc>, Decimal)> {
    if payment.transactions.is_empty() {
        vec![(payment.created_at, payment.amount_paid)]
    } else {
        payment
            .transactions
            .iter()
            .map(|t| (t.created_at, t.amount))
            .collect()
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month `delta` months away from `start`'s month.
fn shift_months(start: NaiveDate, delta: i32) -> NaiveDate {
    let index = start.year() * 12 + start.month0() as i32 + delta;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(start)
}

fn revenue_between(payments: &[Payment], from: NaiveDate, until: NaiveDate) -> Decimal {
    payments
        .iter()
        .flat_map(revenue_events)
        .filter(|(at, _)| {
            let day = at.date_naive();
            day >= from && day < until
        })
        .map(|(_, amount)| amount)
        .sum()
}

/// Revenue per calendar month for the `months` months ending with `today`'s.
pub fn revenue_by_month(payments: &[Payment], today: NaiveDate, months: u32) -> Vec<MonthRevenue> {
    let current = month_start(today);
    (0..months as i32)
        .rev()
        .map(|back| {
            let start = shift_months(current, -back);
            let end = shift_months(start, 1);
            MonthRevenue {
                month: start.format("%Y-%m").to_string(),
                label: start.format("%b %y").to_string(),
                revenue: revenue_between(payments, start, end),
            }
        })
        .collect()
}

/// Count and paid sum per method; records without a method land in `other`.
pub fn payment_method_breakdown(payments: &[Payment]) -> Vec<MethodBucket> {
    let mut buckets: Vec<MethodBucket> = PaymentMethod::ALL
        .iter()
        .map(|m| MethodBucket {
            method: m.as_str(),
            label: m.label(),
            count: 0,
            amount: Decimal::ZERO,
        })
        .collect();
    buckets.push(MethodBucket {
        method: "other",
        label: "Other",
        count: 0,
        amount: Decimal::ZERO,
    });
    let other = buckets.len() - 1;

    for payment in payments {
        let idx = payment
            .payment_method
            .and_then(|m| PaymentMethod::ALL.iter().position(|x| *x == m))
            .unwrap_or(other);
        buckets[idx].count += 1;
        buckets[idx].amount += payment.amount_paid;
    }
    buckets
}

/// Records still owing money, largest balance first, ties by patient name.
pub fn outstanding_balances(payments: &[Payment], top: usize) -> OutstandingBalances {
    let mut owing: Vec<&Payment> = payments.iter().filter(|p| p.has_balance()).collect();
    owing.sort_by(|a, b| {
        b.remaining_balance
            .cmp(&a.remaining_balance)
            .then_with(|| a.patient_name.cmp(&b.patient_name))
    });

    let top_patients: Vec<OutstandingEntry> = owing
        .into_iter()
        .take(top)
        .map(|p| OutstandingEntry {
            payment_id: p.id.clone(),
            patient_id: p.patient_id.clone(),
            patient_name: p.patient_name.clone(),
            remaining_balance: p.remaining_balance,
            total_amount: p.total_amount,
        })
        .collect();

    OutstandingBalances {
        total: top_patients.iter().map(|e| e.remaining_balance).sum(),
        count: top_patients.len(),
        top_patients,
    }
}

pub fn expenses_by_category(expenses: &[Expense]) -> Vec<CategoryTotal> {
    ExpenseCategory::ALL
        .iter()
        .map(|category| CategoryTotal {
            category: *category,
            label: category.label(),
            amount: expenses
                .iter()
                .filter(|e| e.category == *category)
                .map(|e| e.amount)
                .sum(),
        })
        .collect()
}

pub fn appointments_by_status(appointments: &[Appointment]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for appt in appointments {
        match appt.status {
            AppointmentStatus::Scheduled => counts.scheduled += 1,
            AppointmentStatus::Completed => counts.completed += 1,
            AppointmentStatus::Cancelled => counts.cancelled += 1,
            AppointmentStatus::NoShow => counts.no_show += 1,
        }
    }
    counts
}

pub fn total_revenue(payments: &[Payment]) -> Decimal {
    payments.iter().map(|p| p.amount_paid).sum()
}

pub fn financial_overview(payments: &[Payment], expenses: &[Expense]) -> FinancialOverview {
    let total_revenue = total_revenue(payments);
    let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();
    FinancialOverview {
        total_revenue,
        total_expenses,
        profit: total_revenue - total_expenses,
    }
}

/// This month against last month. The change is 100 when last month had no
/// revenue but this month does, and 0 when both are empty.
pub fn revenue_insights(payments: &[Payment], today: NaiveDate) -> RevenueInsights {
    let this_start = month_start(today);
    let last_start = shift_months(this_start, -1);
    let next_start = shift_months(this_start, 1);

    let this_month_revenue = revenue_between(payments, this_start, next_start);
    let last_month_revenue = revenue_between(payments, last_start, this_start);

    let change_pct = if last_month_revenue > Decimal::ZERO {
        ((this_month_revenue - last_month_revenue) / last_month_revenue * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    } else if this_month_revenue > Decimal::ZERO {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    RevenueInsights {
        this_month_revenue,
        last_month_revenue,
        change_pct,
    }
}

/// Scheduled appointments from today through a week ahead.
pub fn upcoming_appointments(appointments: &[Appointment], today: NaiveDate) -> Vec<UpcomingAppointment> {
    let horizon = today + Duration::days(UPCOMING_DAYS);
    let mut upcoming: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| {
            a.status == AppointmentStatus::Scheduled
                && a.appointment_date >= today
                && a.appointment_date <= horizon
        })
        .collect();
    upcoming.sort_by(|a, b| {
        a.appointment_date
            .cmp(&b.appointment_date)
            .then_with(|| a.time_slot.cmp(&b.time_slot))
    });
    upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .map(|a| UpcomingAppointment {
            id: a.id.clone(),
            patient_name: a.patient_name.clone(),
            appointment_date: a.appointment_date,
            time_slot: a.time_slot.clone(),
            treatment_type: a.treatment_type.clone(),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Assembled reports
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub patient_count: i64,
    /// Scheduled appointments, any date.
    pub appointment_count: usize,
    pub today_appointments: usize,
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub revenue_by_month: Vec<MonthRevenue>,
    pub payment_methods: Vec<MethodBucket>,
    pub appointments_by_status: StatusCounts,
    pub total_revenue: Decimal,
    pub revenue_insights: RevenueInsights,
    pub outstanding_balances: OutstandingBalances,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReport {
    pub financial_overview: FinancialOverview,
    pub revenue_by_month: Vec<MonthRevenue>,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub payment_methods: Vec<MethodBucket>,
    pub appointments_by_status: StatusCounts,
    pub patient_stats: PatientStats,
    pub outstanding_balances: OutstandingBalances,
}

struct Collections {
    payments: Vec<Payment>,
    expenses: Vec<Expense>,
    appointments: Vec<Appointment>,
}

fn load(conn: &Connection) -> Result<Collections, DatabaseError> {
    Ok(Collections {
        payments: repository::list_payments(conn, &PaymentFilter::default())?,
        expenses: repository::list_expenses(conn, &ExpenseFilter::default())?,
        appointments: repository::list_appointments(conn, &AppointmentFilter::default())?,
    })
}

pub fn dashboard_stats(conn: &Connection, today: NaiveDate) -> Result<DashboardStats, DatabaseError> {
    let data = load(conn)?;
    let overview = financial_overview(&data.payments, &data.expenses);
    let scheduled = data
        .appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled);

    Ok(DashboardStats {
        patient_count: repository::count_patients(conn)?,
        appointment_count: scheduled.clone().count(),
        today_appointments: scheduled.filter(|a| a.appointment_date == today).count(),
        total_revenue: overview.total_revenue,
        total_expenses: overview.total_expenses,
        profit: overview.profit,
    })
}

pub fn dashboard_analytics(conn: &Connection, today: NaiveDate) -> Result<DashboardAnalytics, DatabaseError> {
    let data = load(conn)?;
    Ok(DashboardAnalytics {
        revenue_by_month: revenue_by_month(&data.payments, today, DEFAULT_MONTHS),
        payment_methods: payment_method_breakdown(&data.payments),
        appointments_by_status: appointments_by_status(&data.appointments),
        total_revenue: total_revenue(&data.payments),
        revenue_insights: revenue_insights(&data.payments, today),
        outstanding_balances: outstanding_balances(&data.payments, DEFAULT_TOP),
        upcoming_appointments: upcoming_appointments(&data.appointments, today),
    })
}

pub fn full_report(
    conn: &Connection,
    today: NaiveDate,
    months: u32,
    top: usize,
) -> Result<FullReport, DatabaseError> {
    let data = load(conn)?;
    Ok(FullReport {
        financial_overview: financial_overview(&data.payments, &data.expenses),
        revenue_by_month: revenue_by_month(&data.payments, today, months.clamp(1, MAX_MONTHS)),
        expenses_by_category: expenses_by_category(&data.expenses),
        payment_methods: payment_method_breakdown(&data.payments),
        appointments_by_status: appointments_by_status(&data.appointments),
        patient_stats: PatientStats {
            total: repository::count_patients(conn)?,
        },
        outstanding_balances: outstanding_balances(&data.payments, top),
    })
}
