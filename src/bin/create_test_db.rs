use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use spendtrack::{PasswordHash, Role, create_user, initialize_db};

/// A utility for creating a test database for the spendtrack server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// Seeds a regular user and an admin. Sign-up only ever creates regular
/// users, so this is the supported way to get an admin account for local
/// testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test users...");

    create_user(
        "test@test.com",
        PasswordHash::new("test", PasswordHash::DEFAULT_COST)?,
        Role::User,
        &conn,
    )?;

    create_user(
        "admin@test.com",
        PasswordHash::new("admin", PasswordHash::DEFAULT_COST)?,
        Role::Admin,
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
