//! The budget model and its database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::DatabaseId, user::UserID};

/// How often a budget resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    /// The string stored in the database `period` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            _ => Err(Error::MissingField("Period")),
        }
    }
}

/// A spending limit over a date range.
///
/// Like expenses, budgets belong exclusively to the user that created them
/// and are never edited or deleted once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The ID for the budget.
    pub id: DatabaseId,
    /// The user that set the budget.
    pub user_id: UserID,
    /// The spending limit in dollars.
    pub budget_amount: f64,
    /// How often the budget resets.
    pub period: Period,
    /// The first day the budget applies to.
    pub start_date: Date,
    /// The last day the budget applies to.
    pub end_date: Date,
}

/// A new budget that has not been inserted into the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub user_id: UserID,
    pub budget_amount: f64,
    pub period: Period,
    pub start_date: Date,
    pub end_date: Date,
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            budget_amount REAL NOT NULL,
            period TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id)
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_budget(row: &rusqlite::Row) -> Result<Budget, rusqlite::Error> {
    let raw_period: String = row.get(3)?;
    // The period column only ever holds values written through [Period], an
    // unknown string means the table was edited by hand.
    let period = Period::from_str(&raw_period).unwrap_or(Period::Monthly);

    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        budget_amount: row.get(2)?,
        period,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
    })
}

/// Insert a new budget owned by `new_budget.user_id`.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred, e.g. the
/// user ID does not refer to a registered user.
pub fn insert_budget(new_budget: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    connection.execute(
        "INSERT INTO budget (user_id, budget_amount, period, start_date, end_date)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            new_budget.user_id.as_i64(),
            new_budget.budget_amount,
            new_budget.period.as_str(),
            &new_budget.start_date,
            &new_budget.end_date,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Budget {
        id,
        user_id: new_budget.user_id,
        budget_amount: new_budget.budget_amount,
        period: new_budget.period,
        start_date: new_budget.start_date,
        end_date: new_budget.end_date,
    })
}

/// Get every budget of every user, most recent first.
///
/// Only admin sessions should reach this query. Regular users are scoped with
/// [list_budgets_by_user] so unauthorized rows are never fetched, not even
/// transiently.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_all_budgets(connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, budget_amount, period, start_date, end_date
            FROM budget ORDER BY start_date DESC, id DESC",
        )?
        .query_map([], map_row_to_budget)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Get the budgets set by the user `user_id`, most recent first.
///
/// Returns an empty list when the user has not set any budgets.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_budgets_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, budget_amount, period, start_date, end_date
            FROM budget WHERE user_id = :user_id ORDER BY start_date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_budget)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod budget_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        auth::PasswordHash,
        db::initialize,
        user::{Role, User, create_user},
    };

    use super::{NewBudget, Period, insert_budget, list_all_budgets, list_budgets_by_user};

    fn init_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn insert_test_user(email: &str, conn: &Connection) -> User {
        create_user(email, PasswordHash::new_unchecked("hunter2"), Role::User, conn)
            .expect("Could not create test user")
    }

    fn new_test_budget(user: &User, budget_amount: f64) -> NewBudget {
        NewBudget {
            user_id: user.id,
            budget_amount,
            period: Period::Monthly,
            start_date: date!(2025 - 06 - 01),
            end_date: date!(2025 - 06 - 30),
        }
    }

    #[test]
    fn insert_budget_succeeds() {
        let conn = init_db();
        let user = insert_test_user("foo@bar.baz", &conn);

        let budget = insert_budget(new_test_budget(&user, 400.0), &conn).unwrap();

        assert!(budget.id > 0);
        assert_eq!(budget.user_id, user.id);
        assert_eq!(budget.budget_amount, 400.0);
        assert_eq!(budget.period, Period::Monthly);
    }

    #[test]
    fn budget_round_trips_through_the_database() {
        let conn = init_db();
        let user = insert_test_user("foo@bar.baz", &conn);

        let inserted = insert_budget(
            NewBudget {
                period: Period::Weekly,
                ..new_test_budget(&user, 120.5)
            },
            &conn,
        )
        .unwrap();

        let got = list_budgets_by_user(user.id, &conn).unwrap();

        assert_eq!(got, vec![inserted]);
    }

    #[test]
    fn list_budgets_by_user_only_returns_own_rows() {
        let conn = init_db();
        let alice = insert_test_user("alice@example.com", &conn);
        let bob = insert_test_user("bob@example.com", &conn);

        let alices_budget = insert_budget(new_test_budget(&alice, 400.0), &conn).unwrap();
        insert_budget(new_test_budget(&bob, 900.0), &conn).unwrap();

        let got = list_budgets_by_user(alice.id, &conn).unwrap();

        assert_eq!(got, vec![alices_budget]);
    }

    #[test]
    fn list_all_budgets_returns_rows_of_every_user() {
        let conn = init_db();
        let alice = insert_test_user("alice@example.com", &conn);
        let bob = insert_test_user("bob@example.com", &conn);

        let alices_budget = insert_budget(new_test_budget(&alice, 400.0), &conn).unwrap();
        let bobs_budget = insert_budget(new_test_budget(&bob, 900.0), &conn).unwrap();

        let got = list_all_budgets(&conn).unwrap();

        assert_eq!(got.len(), 2, "want 2 budgets, got {}", got.len());
        assert!(got.contains(&alices_budget));
        assert!(got.contains(&bobs_budget));
    }

    #[test]
    fn list_budgets_by_user_returns_empty_list_without_rows() {
        let conn = init_db();
        let alice = insert_test_user("alice@example.com", &conn);

        let got = list_budgets_by_user(alice.id, &conn).unwrap();

        assert_eq!(got, vec![]);
    }

    #[test]
    fn period_round_trips_through_strings() {
        for period in [Period::Weekly, Period::Monthly] {
            assert_eq!(period.as_str().parse::<Period>().unwrap(), period);
        }
    }
}
