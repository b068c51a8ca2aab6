//! Start-up initialization against a database file.

use crate::sqlite::helpers::TestDatabase;
use eyre::ensure;
use storyloom::storage::{
    SchemaManager, TABLE_CREATION_ORDER, build_pool, establish, foreign_keys_enabled,
    initialize_application_database, try_initialize_application_database,
};

#[test]
fn empty_store_gains_exactly_the_five_workflow_tables() -> eyre::Result<()> {
    let database = TestDatabase::empty()?;
    let mut connection = establish(database.url())?;

    let report = try_initialize_application_database(&mut connection, true)?;

    let expected: Vec<&str> = TABLE_CREATION_ORDER.iter().map(|table| table.name()).collect();
    ensure!(report.created == expected);
    ensure!(report.verified);
    let mut existing = SchemaManager::new().existing_tables(&mut connection)?;
    existing.sort();
    ensure!(existing == ["reviews", "scripts", "stories", "story_reviews", "titles"]);
    Ok(())
}

#[test]
fn restarting_against_the_same_file_creates_nothing() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let mut connection = establish(database.url())?;

    let report = try_initialize_application_database(&mut connection, true)?;

    ensure!(report.created.is_empty());
    ensure!(initialize_application_database(&mut connection, true));
    Ok(())
}

#[test]
fn pooled_connections_enforce_foreign_keys() -> eyre::Result<()> {
    let database = TestDatabase::initialized()?;
    let pool = build_pool(database.url(), 1)?;
    let mut connection = pool.get()?;

    ensure!(foreign_keys_enabled(&mut connection)?);
    Ok(())
}
