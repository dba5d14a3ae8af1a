//! Schema reconciliation.
//!
//! Compares the live database against the compiled-in canonical schema and
//! creates whatever is missing. All DDL is `CREATE ... IF NOT EXISTS` and
//! all seed data is `INSERT IGNORE`, so a reconciliation pass over an
//! already-correct database is a no-op.
//!
//! Statement failures inside a pass are logged and skipped; a partially
//! built schema is still more useful than none, and the next pass retries
//! exactly the still-missing objects.

use std::collections::BTreeSet;

use sqlx::MySqlPool;
use tracing::{info, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};

/// One required table: name, creation DDL, optional reference seed rows.
pub struct TableSpec {
    pub name: &'static str,
    pub ddl: &'static str,
    pub seed: Option<&'static str>,
}

/// The canonical ClubConnect schema. Fixed and compiled-in; not user-editable.
pub const REQUIRED_TABLES: &[TableSpec] = &[
    TableSpec {
        name: "clubs",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `clubs` (
              `Club_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Name` varchar(200) NOT NULL,
              `Status` varchar(50) DEFAULT 'Active',
              `Category` varchar(100) DEFAULT NULL,
              `Description` text DEFAULT NULL,
              `Budget_Proposal` decimal(12,2) DEFAULT NULL,
              `Member_Capacity` int(11) DEFAULT NULL,
              `Approved_Budget` decimal(12,2) DEFAULT NULL,
              `Approved_By` int(11) DEFAULT NULL,
              `Logo` longblob DEFAULT NULL,
              `Logo_Type` varchar(50) DEFAULT NULL,
              `Logo_Size` int(11) DEFAULT NULL,
              `Created_Date` timestamp NULL DEFAULT current_timestamp(),
              `Created_By` int(11) DEFAULT NULL
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "club_membership",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `club_membership` (
              `Membership_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `User_ID` int(11) NOT NULL,
              `Club_ID` int(11) NOT NULL,
              `Membership_Status` varchar(50) DEFAULT 'Pending',
              `Membership_Role` varchar(100) DEFAULT 'Member',
              `Application_Date` timestamp NULL DEFAULT current_timestamp(),
              `Approved_Date` timestamp NULL DEFAULT NULL,
              `Approved_By` int(11) DEFAULT NULL,
              `Left_Date` timestamp NULL DEFAULT NULL,
              `Rejection_Reason` text DEFAULT NULL
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "events",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `events` (
              `Event_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Title` varchar(255) NOT NULL,
              `Type` varchar(100) DEFAULT NULL,
              `Description` text DEFAULT NULL,
              `Date` date NOT NULL,
              `Status` varchar(50) DEFAULT 'Scheduled',
              `Start_Time` time DEFAULT NULL,
              `End_Time` time DEFAULT NULL,
              `Resource_ID` int(11) DEFAULT NULL,
              `Is_Budget_Requested` tinyint(1) DEFAULT 0,
              `Budget_Amount` decimal(12,2) DEFAULT NULL,
              `Budget_Status` varchar(50) DEFAULT NULL,
              `Approved_By` int(11) DEFAULT NULL,
              `Created_Date` timestamp NULL DEFAULT current_timestamp(),
              `Created_By` int(11) DEFAULT NULL,
              `Club_ID` int(11) DEFAULT NULL
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "announcements",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `announcements` (
              `Announcement_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Club_ID` int(11) DEFAULT NULL,
              `Created_By` int(11) DEFAULT NULL,
              `Content` text NOT NULL,
              `Title` varchar(255) NOT NULL,
              `Target_Audience` varchar(100) DEFAULT NULL,
              `Expiry_Date` date DEFAULT NULL,
              `Created_Date` timestamp NULL DEFAULT current_timestamp()
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "discussion_comments",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `discussion_comments` (
              `Comment_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Message` text NOT NULL,
              `User_ID` int(11) NOT NULL,
              `Discussion_ID` int(11) NOT NULL,
              `TimeStamp` timestamp NULL DEFAULT current_timestamp()
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "discussion_forum",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `discussion_forum` (
              `Discussion_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Title` varchar(255) NOT NULL,
              `Message` text NOT NULL,
              `TimeStamp` timestamp NULL DEFAULT current_timestamp(),
              `Club_ID` int(11) DEFAULT NULL
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "resources",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `resources` (
              `Resource_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Name` varchar(200) NOT NULL,
              `Type` varchar(100) DEFAULT NULL,
              `Capacity` int(11) DEFAULT NULL,
              `Is_Available` tinyint(1) DEFAULT 1,
              `Location` varchar(255) DEFAULT NULL,
              `Description` text DEFAULT NULL,
              `Created_Date` timestamp NULL DEFAULT current_timestamp(),
              `Updated_Date` timestamp NULL DEFAULT current_timestamp()
            )
        "#,
        seed: Some(
            r#"
            INSERT IGNORE INTO `resources` (`Resource_ID`, `Name`, `Type`, `Capacity`, `Is_Available`, `Location`, `Description`) VALUES
            (1, 'Main Auditorium', 'Venue', 300, 1, 'Building A, Floor 1', NULL),
            (2, 'Conference Room A', 'Meeting Room', 30, 1, 'Building B, Floor 2', NULL),
            (3, 'Photography Studio', 'Studio', 15, 1, 'Arts Building, Floor 3', NULL),
            (4, 'Computer Lab 1', 'Lab', 50, 1, 'Tech Building, Floor 1', NULL)
        "#,
        ),
    },
    TableSpec {
        name: "rsvps",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `rsvps` (
              `RSVP_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `User_ID` int(11) NOT NULL,
              `Event_ID` int(11) NOT NULL,
              `Status` varchar(50) DEFAULT 'Pending',
              `Date` timestamp NULL DEFAULT current_timestamp(),
              `Attendance_Marked` tinyint(1) DEFAULT 0
            )
        "#,
        seed: None,
    },
    TableSpec {
        name: "roles",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `roles` (
              `Role_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Role_Name` varchar(100) NOT NULL,
              `Description` text DEFAULT NULL,
              `Created_Date` timestamp NULL DEFAULT current_timestamp()
            )
        "#,
        seed: Some(
            r#"
            INSERT IGNORE INTO `roles` (`Role_ID`, `Role_Name`, `Description`) VALUES
            (1, 'admin', 'Full system access and management'),
            (4, 'guest', 'General student user')
        "#,
        ),
    },
    TableSpec {
        name: "system_users",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS `system_users` (
              `User_ID` bigint(20) UNSIGNED NOT NULL PRIMARY KEY,
              `Full_Names` varchar(200) NOT NULL,
              `Email` varchar(255) NOT NULL,
              `Username` varchar(100) NOT NULL,
              `Password_Hash` varchar(255) NOT NULL,
              `Role_ID` int(11) DEFAULT 4,
              `Profile_Picture` longblob DEFAULT NULL,
              `Profile_Picture_Type` varchar(50) DEFAULT NULL,
              `Profile_Picture_Size` int(11) DEFAULT NULL,
              `Status` varchar(50) DEFAULT 'Active',
              `Registration_Date` timestamp NULL DEFAULT current_timestamp()
            )
        "#,
        seed: None,
    },
];

/// Names of all required tables, in canonical order.
pub fn required_table_names() -> Vec<&'static str> {
    REQUIRED_TABLES.iter().map(|spec| spec.name).collect()
}

/// Outcome of a best-effort creation pass.
#[derive(Debug, Default)]
pub struct SchemaReport {
    pub created: Vec<String>,
    pub failed: Vec<String>,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// MySQL identifier quoting (backticks, embedded backticks doubled).
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Checks whether a database of the given name exists on the server.
///
/// "Not found" is `Ok(false)`; only connectivity failures error.
#[instrument(skip(server_pool))]
pub async fn database_exists(server_pool: &MySqlPool, name: &str) -> EngineResult<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM information_schema.SCHEMATA
        WHERE LOWER(SCHEMA_NAME) = LOWER(?)
        "#,
    )
    .bind(name)
    .fetch_one(server_pool)
    .await
    .map_err(|e| EngineError::execution_error(e.to_string()))?;

    Ok(count > 0)
}

/// Returns the required tables absent from the pool's current schema.
/// An empty set means the schema is complete.
#[instrument(skip(db_pool))]
pub async fn tables_missing(db_pool: &MySqlPool) -> EngineResult<BTreeSet<String>> {
    // Cast to CHAR to avoid BINARY type mismatch with Rust String
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT CAST(TABLE_NAME AS CHAR) AS table_name
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE()
        "#,
    )
    .fetch_all(db_pool)
    .await
    .map_err(|e| EngineError::execution_error(e.to_string()))?;

    let present: BTreeSet<String> = rows
        .into_iter()
        .map(|(name,)| name.to_lowercase())
        .collect();

    let missing = REQUIRED_TABLES
        .iter()
        .map(|spec| spec.name)
        .filter(|name| !present.contains(&name.to_lowercase()))
        .map(String::from)
        .collect();

    Ok(missing)
}

/// Creates the database if it does not exist. Idempotent.
#[instrument(skip(server_pool))]
pub async fn create_database(server_pool: &MySqlPool, name: &str) -> EngineResult<()> {
    let sql = format!(
        "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET utf8mb4",
        quote_ident(name)
    );

    sqlx::query(&sql)
        .execute(server_pool)
        .await
        .map_err(|e| EngineError::schema(e.to_string()))?;

    info!(database = name, "database created or already present");
    Ok(())
}

/// Creates exactly the named missing tables, then applies the reference
/// seed rows for every seeded table.
///
/// A failed statement is logged with its intent and skipped; the rest of
/// the batch still runs.
#[instrument(skip(db_pool, missing), fields(missing_count = missing.len()))]
pub async fn create_missing_tables(
    db_pool: &MySqlPool,
    missing: &BTreeSet<String>,
) -> SchemaReport {
    let mut report = SchemaReport::default();

    for spec in REQUIRED_TABLES {
        if !missing.contains(spec.name) {
            continue;
        }
        match sqlx::query(spec.ddl).execute(db_pool).await {
            Ok(_) => {
                info!(table = spec.name, "table created");
                report.created.push(spec.name.to_string());
            }
            Err(e) => {
                warn!(table = spec.name, error = %e, "table creation failed; continuing");
                report.failed.push(spec.name.to_string());
            }
        }
    }

    // Seeds run on every pass; INSERT IGNORE keeps them from duplicating.
    for spec in REQUIRED_TABLES {
        let Some(seed) = spec.seed else { continue };
        if let Err(e) = sqlx::query(seed).execute(db_pool).await {
            warn!(table = spec.name, error = %e, "seed insert failed; continuing");
            report.failed.push(format!("{} (seed)", spec.name));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_schema_covers_the_required_set() {
        let names = required_table_names();
        assert_eq!(names.len(), 10);
        for expected in [
            "clubs",
            "club_membership",
            "events",
            "announcements",
            "discussion_comments",
            "discussion_forum",
            "resources",
            "rsvps",
            "roles",
            "system_users",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn all_ddl_is_idempotent() {
        for spec in REQUIRED_TABLES {
            assert!(
                spec.ddl.trim_start().starts_with("CREATE TABLE IF NOT EXISTS"),
                "{} DDL must be create-if-not-exists",
                spec.name
            );
            assert!(
                spec.ddl.contains("PRIMARY KEY"),
                "{} DDL must declare a primary key",
                spec.name
            );
        }
    }

    #[test]
    fn all_seeds_are_idempotent() {
        let seeded: Vec<_> = REQUIRED_TABLES
            .iter()
            .filter(|spec| spec.seed.is_some())
            .map(|spec| spec.name)
            .collect();
        assert_eq!(seeded, vec!["resources", "roles"]);

        for spec in REQUIRED_TABLES {
            if let Some(seed) = spec.seed {
                assert!(
                    seed.trim_start().starts_with("INSERT IGNORE"),
                    "{} seed must be insert-if-absent",
                    spec.name
                );
            }
        }
    }

    #[test]
    fn quoting_doubles_embedded_backticks() {
        assert_eq!(quote_ident("clubs"), "`clubs`");
        assert_eq!(quote_ident("odd`name"), "`odd``name`");
    }
}
