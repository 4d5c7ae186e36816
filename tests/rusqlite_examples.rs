use std::sync::Arc;

use anyhow::Result;
use rust_records::{
    ConnectionProvider, DbConfig, DbError, Executor, Filter, Record, TableRegistry,
};
use rusqlite::Connection;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "users")]
struct User {
    #[column("id")]
    id: i64,
    #[column("name")]
    name: String,
    #[column("email")]
    email: Option<String>,
    #[column("age")]
    age: i64,
    // session-only, never stored
    logged_in: bool,
}

// Helper function to create a temporary file-based database
fn create_temp_db() -> Result<(DbConfig, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let path = temp_file.path().to_str().unwrap().to_string();
    let config = DbConfig::new("localhost", 0, path, "tester", "secret");
    initialize_schema(&config.connect()?)?;
    Ok((config, temp_file))
}

// Initialize the database schema
fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            age INTEGER
        );
        INSERT INTO users (id, name) VALUES (1, 'Alice'), (2, 'Bob');
        "#,
    )
}

fn executor(config: &DbConfig) -> Executor {
    Executor::new(Arc::new(config.clone()))
}

fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        ..User::default()
    }
}

#[test]
fn test_users_scenario() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    let alices: Vec<User> = db.get_list("users", "name", "Alice")?;
    assert_eq!(alices, vec![user(1, "Alice")]);

    let range: Vec<User> = db.get_range("users", "id", 1, 1)?;
    assert_eq!(range, vec![user(1, "Alice")]);

    assert!(db.update(&user(2, "Bobby"), "users")?);
    let bob: Option<User> = db.get_one("users", "id", 2)?;
    assert_eq!(bob.map(|u| u.name), Some("Bobby".to_string()));

    Ok(())
}

#[test]
fn test_insert_then_read_back() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    let carol = User {
        id: 3,
        name: "Carol".into(),
        email: Some("carol@example.com".into()),
        age: 41,
        logged_in: true,
    };
    db.insert(&carol, "users")?;

    let stored: User = db.get_one("users", "id", 3)?.expect("inserted row");
    assert_eq!(stored.id, carol.id);
    assert_eq!(stored.name, carol.name);
    assert_eq!(stored.email, carol.email);
    assert_eq!(stored.age, carol.age);
    // unmapped fields come back at their default
    assert!(!stored.logged_in);

    Ok(())
}

#[test]
fn test_get_one_without_match_is_none() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let missing: Option<User> = executor(&config).get_one("users", "name", "Nobody")?;
    assert!(missing.is_none());
    Ok(())
}

#[test]
fn test_get_one_with_many_matches_returns_one() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);
    db.insert(&user(3, "Alice"), "users")?;

    let alice: Option<User> = db.get_one("users", "name", "Alice")?;
    let alice = alice.expect("a match");
    assert_eq!(alice.name, "Alice");
    assert!([1, 3].contains(&alice.id));
    Ok(())
}

#[test]
fn test_range_includes_both_bounds() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);
    for (id, name) in [(3, "Carol"), (4, "Dave"), (5, "Eve")] {
        db.insert(&user(id, name), "users")?;
    }

    let ids: Vec<i64> = db
        .get_range::<User>("users", "id", 2, 4)?
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(ids, vec![2, 3, 4]);
    Ok(())
}

#[test]
fn test_two_predicates_are_anded() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);
    db.insert(&User { age: 30, ..user(3, "Alice") }, "users")?;

    let hits: Vec<User> = db.get_list_and("users", "name", "Alice", "age", 30)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 3);

    let hits: Vec<User> =
        db.get_where("users", &[Filter::eq("name", "Bob"), Filter::eq("age", 30)])?;
    assert!(hits.is_empty());
    Ok(())
}

#[test]
fn test_null_round_trip() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    // email and age are NULL for Alice
    let alice: User = db.get_one("users", "id", 1)?.expect("seeded row");
    assert_eq!(alice.email, None);
    assert_eq!(alice.age, 0);

    db.insert(&User { id: 10, ..alice }, "users")?;

    let conn = config.connect()?;
    let (email_null, age): (bool, Option<i64>) = conn.query_row(
        "SELECT email IS NULL, age FROM users WHERE id = 10",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    // Option fields keep NULL; plain fields write back their default
    assert!(email_null);
    assert_eq!(age, Some(0));
    Ok(())
}

#[test]
fn test_delete_by_id() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    db.delete_by_id(&user(1, "ignored"), "users")?;

    let remaining: Vec<User> = db.get_all("users")?;
    assert_eq!(remaining, vec![user(2, "Bob")]);
    Ok(())
}

#[test]
fn test_crafted_column_name_is_not_a_tautology() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    // the value spells the name's text, so a string-literal fallback would match every row
    let err = db
        .get_list::<User>("users", "name' OR '1'='1", "name'' OR ''1''=''1")
        .unwrap_err();
    assert!(matches!(err, DbError::Driver(_)));
    Ok(())
}

#[test]
fn test_misspelled_columns_are_driver_errors() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = executor(&config);

    let err = db.get_list::<User>("users", "nmae", "nmae").unwrap_err();
    assert!(matches!(err, DbError::Driver(_)));
    let err = db.get_one::<User>("users", "nmae", "Alice").unwrap_err();
    assert!(matches!(err, DbError::Driver(_)));
    let err = db.get_range::<User>("users", "idd", 1, 5).unwrap_err();
    assert!(matches!(err, DbError::Driver(_)));
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "legacy_people", id = "person_id")]
struct Person {
    #[column("person_id")]
    id: i64,
    #[column("o'k")]
    ok: String,
}

#[test]
fn test_quoted_names_address_real_columns() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    config.connect()?.execute_batch(
        r#"CREATE TABLE legacy_people (person_id INTEGER PRIMARY KEY, "o'k" TEXT);
           INSERT INTO legacy_people VALUES (1, 'x'), (2, 'y');"#,
    )?;
    let db = executor(&config);

    let hits: Vec<Person> = db.get_list("legacy_people", "o'k", "x")?;
    assert_eq!(
        hits,
        vec![Person {
            id: 1,
            ok: "x".into()
        }]
    );
    Ok(())
}

#[test]
fn test_identity_column_drift_is_a_driver_error() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    config
        .connect()?
        .execute_batch("CREATE TABLE people (id INTEGER PRIMARY KEY, \"o'k\" TEXT);")?;
    let db = executor(&config);

    let person = Person {
        id: 1,
        ok: "x".into(),
    };
    assert!(matches!(db.update(&person, "people"), Err(DbError::Driver(_))));
    assert!(matches!(
        db.delete_by_id(&person, "people"),
        Err(DbError::Driver(_))
    ));
    Ok(())
}

#[test]
fn test_schema_drift_is_reported() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    config.connect()?.execute_batch(
        "CREATE TABLE legacy_users (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO legacy_users VALUES (1, 'Old');",
    )?;

    let err = executor(&config)
        .get_all::<User>("legacy_users")
        .unwrap_err();
    assert!(matches!(err, DbError::SchemaMismatch { ref column, .. } if column == "email"));
    Ok(())
}

#[test]
fn test_initialize_populates_cache() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = rust_records::initialize(
        &config.server,
        config.port,
        &config.database,
        &config.username,
        &config.password,
        TableRegistry::new().register::<User>(),
    )?;

    let cached = db.get_cache::<User>("users")?.expect("users cached");
    assert_eq!(cached.len(), 2);
    assert!(db.get_cache::<User>("orders")?.is_none());
    Ok(())
}

#[test]
fn test_cache_is_not_updated_by_writes() -> Result<()> {
    let (config, _file) = create_temp_db()?;
    let db = rust_records::Database::initialize(config, TableRegistry::new().register::<User>())?;

    db.executor().insert(&user(3, "Carol"), "users")?;
    assert_eq!(db.get_cache::<User>("users")?.expect("cached").len(), 2);

    db.refresh_cache()?;
    assert_eq!(db.get_cache::<User>("users")?.expect("cached").len(), 3);
    Ok(())
}
