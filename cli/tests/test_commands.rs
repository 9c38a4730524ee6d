//! Admin commands against real databases.

use clap::Parser;
use lineage_cli::args::Cli;
use lineage_cli::commands::{regenerate, RegenerateOutcome};
use lineage_cli::{load_config, run};
use lineage_commons::LutRow;
use lineage_core::{Lineage, NeutralPolicy, NoopAlterer, RegenerationReport};
use lineage_store::test_utils::TestDb;
use lineage_store::Database;
use std::sync::Arc;

fn lineage(test_db: &TestDb) -> Lineage {
    Lineage::new(
        test_db.config.clone(),
        test_db.db.clone(),
        Arc::new(NeutralPolicy),
        Arc::new(NoopAlterer),
    )
    .unwrap()
}

#[test]
fn test_full_regenerate_rebuilds_table() {
    let test_db = TestDb::new().unwrap();
    let node = test_db.create_container("Book").unwrap();
    let file = test_db.create_leaf("scan.tiff").unwrap();
    let media = test_db
        .create_wrapper("Scan", Some(node), &[("field_media_file", file)])
        .unwrap();

    let outcome = regenerate(&lineage(&test_db), &[]).unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.summary(), "Regenerated lookup-table.");
    assert_eq!(
        test_db.lut_rows().unwrap(),
        vec![LutRow::new(node.as_i64(), media.as_i64(), Some(file.as_i64()))]
    );
}

#[test]
fn test_scoped_regenerate_reports_missing_wrappers() {
    let test_db = TestDb::new().unwrap();
    let node = test_db.create_container("Book").unwrap();
    let media = test_db.create_wrapper("Remote", Some(node), &[]).unwrap();

    let outcome = regenerate(&lineage(&test_db), &[media.as_i64(), 404]).unwrap();

    assert!(!outcome.is_success());
    assert_eq!(outcome.summary(), "Regenerated 1; failed regenerating 1 records.");
    match outcome {
        RegenerateOutcome::Scoped(RegenerationReport { regenerated, failed }) => {
            assert_eq!(regenerated, 1);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].as_i64(), 404);
        },
        other => panic!("expected a scoped outcome, got {:?}", other),
    }
    assert_eq!(
        test_db.lut_rows().unwrap(),
        vec![LutRow::sentinel(node.as_i64(), media.as_i64())]
    );
}

#[test]
fn test_init_schema_then_regenerate_on_disk() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("lineage.db");
    let path = path.to_str().unwrap();

    let init = Cli::try_parse_from(["lineage-admin", "--database", path, "init-schema", "--with-entities"]).unwrap();
    let config = load_config(&init).unwrap();
    assert_eq!(config.database.path, path);
    assert!(run(&init, config).unwrap());

    let db = Database::open(path).unwrap();
    let tables: i64 = db
        .with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('hierarchical_access_lut', 'node', 'media', 'file_managed')",
                [],
                |row| row.get(0),
            )
            .map_err(lineage_store::StoreError::from)
        })
        .unwrap();
    assert_eq!(tables, 4);
    drop(db);

    let full = Cli::try_parse_from(["lineage-admin", "--database", path, "regenerate"]).unwrap();
    let config = load_config(&full).unwrap();
    assert!(run(&full, config).unwrap());
}

#[test]
fn test_missing_config_file_is_an_error() {
    let cli = Cli::try_parse_from(["lineage-admin", "--config", "/nonexistent/lineage.toml", "regenerate"]).unwrap();
    let err = load_config(&cli).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/lineage.toml"));
}
