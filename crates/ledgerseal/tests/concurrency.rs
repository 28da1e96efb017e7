//! Concurrent issuance through one ledger over the filesystem store.

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use ledgerseal::core::{report_hash_of, Signer};
use ledgerseal::store::FsOptions;
use ledgerseal::{
    EntryId, FsStore, KeyRecord, KeyRegistry, Keypair, Ledger, LedgerConfig, LedgerEntry,
    LedgerError, Outcome, SubjectType,
};
use tempfile::TempDir;

fn open_ledger(dir: &TempDir) -> Result<Arc<Ledger<FsStore>>> {
    let keypair = Keypair::from_seed(&[0x42; 32]);
    let registry = KeyRegistry::new(
        "K1",
        KeyRecord::ed25519(keypair.public_key(), "2026-01-01T00:00:00.000Z"),
    );
    let config = LedgerConfig::at(dir.path());
    let store = FsStore::open(dir.path(), FsOptions::default())?;
    Ok(Arc::new(Ledger::new(
        config,
        store,
        registry,
        Some(Signer::new(keypair)),
    )))
}

fn candidate(id: &str, subject_ref: &str) -> LedgerEntry {
    LedgerEntry::new(
        id,
        "2026-02-01T05:00:00.000Z",
        SubjectType::App,
        subject_ref,
        "sv-0.1",
        Outcome::Pass,
        report_hash_of(format!("{id}/{subject_ref}").as_bytes()),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_same_id_race_commits_once() -> Result<()> {
    let dir = TempDir::new()?;
    let ledger = open_ledger(&dir)?;

    let mut handles = Vec::new();
    for i in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.issue(candidate("E1", &format!("subject-{i}"))).await
        }));
    }

    let mut winners = Vec::new();
    let mut duplicates = 0;
    for handle in handles {
        match handle.await? {
            Ok(sealed) => winners.push(sealed),
            Err(LedgerError::DuplicateEntryId(id)) => {
                assert_eq!(id, EntryId::new("E1"));
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(duplicates, 15);

    let winner = &winners[0];
    assert_eq!(ledger.get(&"E1".into()).await?.as_ref(), Some(winner));

    let day = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    let log = fs::read_to_string(ledger.store().log_path(day))?;
    assert_eq!(log, format!("{}\n", winner.to_json()));

    // only the winner's subject was indexed
    assert_eq!(ledger.lookup_subject(winner.subject_ref()).await?.len(), 1);
    for i in 0..16 {
        let subject = format!("subject-{i}");
        if subject != winner.subject_ref() {
            assert!(ledger.lookup_subject(&subject).await?.is_empty());
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_distinct_ids_same_subject_all_indexed() -> Result<()> {
    let dir = TempDir::new()?;
    let ledger = open_ledger(&dir)?;

    let mut handles = Vec::new();
    for i in 0..32 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.issue(candidate(&format!("E{i:02}"), "shared")).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let mut ids = ledger.lookup_subject("shared").await?;
    assert_eq!(ids.len(), 32);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 32);

    let day = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    let reports = ledger.audit_day(day).await?;
    assert_eq!(reports.len(), 32);
    assert!(reports.iter().all(|r| r.is_valid()));

    // every log line is a whole entry
    let log = fs::read_to_string(ledger.store().log_path(day))?;
    assert_eq!(log.lines().count(), 32);
    Ok(())
}
