//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The access level of a user account.
///
/// Admins can view the expenses, budgets and account details of every user.
/// Regular users only ever see their own rows. Sign-up always creates regular
/// users; admin accounts are created with the `create_test_db` tool or by
/// editing the database directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular account that can only access its own rows.
    #[default]
    User,
    /// An account that can view every user's rows.
    Admin,
}

impl Role {
    /// The string stored in the database `role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::NotFound),
        }
    }
}

/// A user of the application, including their password hash.
///
/// This type is only used for credential checks. Code that displays accounts
/// should use [UserAccount] so that password hashes do not travel further
/// than the log-in handler.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email the user signed up with.
    pub email: String,
    /// The user's access level.
    pub role: Role,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The account details of a user, safe to display.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email the user signed up with.
    pub email: String,
    /// The user's access level.
    pub role: Role,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user with the given `role` into the database.
///
/// # Errors
///
/// Returns [Error::DuplicateEmail] if `email` is already registered, or
/// [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    email: &str,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, password, role) VALUES (?1, ?2, ?3)",
        (email, password_hash.as_ref(), role.as_str()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        role,
        password_hash,
    })
}

/// Get the user registered with `email`, including their password hash.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password, role FROM user WHERE email = :email")?
        .query_row(&[(":email", email)], |row| {
            let id = UserID::new(row.get(0)?);
            let email: String = row.get(1)?;
            let raw_password_hash: String = row.get(2)?;
            let raw_role: String = row.get(3)?;

            Ok((id, email, raw_password_hash, raw_role))
        })
        .map_err(Error::from)
        .and_then(|(id, email, raw_password_hash, raw_role)| {
            Ok(User {
                id,
                email,
                role: Role::from_str(&raw_role)?,
                password_hash: PasswordHash::new_unchecked(&raw_password_hash),
            })
        })
}

/// Resolve the user ID for `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `email` does not belong to a registered user.
pub fn find_user_id_by_email(email: &str, connection: &Connection) -> Result<UserID, Error> {
    connection
        .prepare("SELECT id FROM user WHERE email = :email")?
        .query_row(&[(":email", email)], |row| row.get(0))
        .map(UserID::new)
        .map_err(Error::from)
}

/// Get the account details of every registered user.
///
/// Only admin sessions should reach this query. Regular users are scoped with
/// [get_account_by_email] instead so that unauthorized rows are never fetched.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_accounts(connection: &Connection) -> Result<Vec<UserAccount>, Error> {
    connection
        .prepare("SELECT id, email, role FROM user ORDER BY id ASC")?
        .query_map([], map_row_to_account)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Get the account details for the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if `email` does not belong to a registered user.
pub fn get_account_by_email(email: &str, connection: &Connection) -> Result<UserAccount, Error> {
    connection
        .prepare("SELECT id, email, role FROM user WHERE email = :email")?
        .query_row(&[(":email", email)], map_row_to_account)
        .map_err(Error::from)
}

fn map_row_to_account(row: &rusqlite::Row) -> Result<UserAccount, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let email = row.get(1)?;
    let raw_role: String = row.get(2)?;
    // An unknown role string means someone edited the table by hand, treat it
    // as a regular user rather than failing the whole listing.
    let role = Role::from_str(&raw_role).unwrap_or(Role::User);

    Ok(UserAccount { id, email, role })
}
