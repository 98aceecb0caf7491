use std::path::Path;

use clap::Parser;
use dropmail_core::memory::MemoryStore;
use dropmail_core::{DirectoryStore, TestAccountStore};

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["dropmail-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn parses_seed_institutions_path() {
    let cli = Cli::try_parse_from(["dropmail-cli", "seed-institutions", "config/institutions.yaml"])
        .expect("expected valid cli args");
    match cli.command {
        Some(Commands::SeedInstitutions { path }) => {
            assert_eq!(path, PathBuf::from("config/institutions.yaml"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_send_batch_with_test_flag() {
    let cli = Cli::try_parse_from(["dropmail-cli", "send-batch", "c1", "3", "--test"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::SendBatch {
            ref campaign_id,
            batch_number: 3,
            test: true,
        }) if campaign_id == "c1"
    ));
}

#[test]
fn send_batch_requires_numeric_batch() {
    assert!(Cli::try_parse_from(["dropmail-cli", "send-batch", "c1", "first"]).is_err());
}

#[test]
fn process_accepts_batch_size_override() {
    let cli = Cli::try_parse_from(["dropmail-cli", "process", "c1", "--batch-size", "500"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Process {
            batch_size: Some(500),
            ..
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["dropmail-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[tokio::test]
async fn repository_seed_loads_into_store() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/institutions.yaml");
    let seed = dropmail_core::load_directory_seed(&path).expect("seed file is valid");

    let store = MemoryStore::new();
    let counts = commands::seed_directory(&store, &seed).await.expect("seeded");
    assert_eq!(counts.institutions, 88);
    assert_eq!(counts.test_accounts, 1);

    let directory = store.institution_directory().await.expect("directory");
    assert_eq!(
        directory.get("RAD").map(|i| i.name.as_str()),
        Some("Radford Highlanders")
    );
    let accounts = store.list_test_accounts().await.expect("accounts");
    assert_eq!(accounts[0].school_code, "RAD");

    // Seeding twice overwrites rather than duplicates.
    commands::seed_directory(&store, &seed).await.expect("reseeded");
    assert_eq!(store.list_institutions().await.expect("list").len(), 88);
}
