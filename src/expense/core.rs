//! The expense model and its database queries.

use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::DatabaseId, user::UserID};

/// A single recorded expense.
///
/// An expense belongs exclusively to the user that created it and is never
/// edited or deleted once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The ID for the expense.
    pub id: DatabaseId,
    /// The user that recorded the expense.
    pub user_id: UserID,
    /// The amount spent in dollars.
    pub amount: f64,
    /// What kind of spending this was, e.g. "food".
    pub category: String,
    /// The day the money was spent.
    pub date: Date,
    /// Free-form notes about the expense.
    pub description: String,
    /// When the row was recorded. Assigned by the server, not the client.
    pub created_at: OffsetDateTime,
}

/// A new expense that has not been inserted into the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: UserID,
    pub amount: f64,
    pub category: String,
    pub date: Date,
    pub description: String,
}

pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id)
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_expense(row: &rusqlite::Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a new expense owned by `new_expense.user_id`.
///
/// The `created_at` timestamp is assigned here, on the server, so clients
/// cannot back-date when a row was recorded.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred, e.g. the
/// user ID does not refer to a registered user.
pub fn insert_expense(new_expense: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expense (user_id, amount, category, date, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            new_expense.user_id.as_i64(),
            new_expense.amount,
            &new_expense.category,
            &new_expense.date,
            &new_expense.description,
            &created_at,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Expense {
        id,
        user_id: new_expense.user_id,
        amount: new_expense.amount,
        category: new_expense.category,
        date: new_expense.date,
        description: new_expense.description,
        created_at,
    })
}

/// Get every expense of every user, most recent first.
///
/// Only admin sessions should reach this query. Regular users are scoped with
/// [list_expenses_by_user] so unauthorized rows are never fetched, not even
/// transiently.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_all_expenses(connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, category, date, description, created_at
            FROM expense ORDER BY date DESC, id DESC",
        )?
        .query_map([], map_row_to_expense)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Get the expenses recorded by the user `user_id`, most recent first.
///
/// Returns an empty list when the user has not recorded any expenses.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_expenses_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, category, date, description, created_at
            FROM expense WHERE user_id = :user_id ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_expense)?
        .map(|row| row.map_err(Error::from))
        .collect()
}
