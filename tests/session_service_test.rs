//! Tests for SessionService

use std::io;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use fundsplit::application::services::{SessionService, DRAFT_FILE, HISTORY_FILE};
use fundsplit::application::ApplicationError;
use fundsplit::domain::{DomainError, Normalizer};
use fundsplit::infrastructure::traits::{FileSystem, RealFileSystem};
use fundsplit::util::testing::init_test_setup;

fn service(dir: &TempDir) -> SessionService {
    init_test_setup();
    SessionService::new(
        Arc::new(RealFileSystem),
        Normalizer::default(),
        &dir.path().join("data"),
    )
}

/// Real filesystem that can be told to fail draft removal or history writes.
#[derive(Default)]
struct FaultyFileSystem {
    fail_remove: bool,
    fail_history_write: bool,
}

impl FileSystem for FaultyFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        RealFileSystem.read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.fail_history_write && path.ends_with(HISTORY_FILE) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        RealFileSystem.write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        RealFileSystem.exists(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        }
        RealFileSystem.remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        RealFileSystem.ensure_parent(path)
    }
}

fn faulty_service(dir: &TempDir, fs: FaultyFileSystem) -> SessionService {
    init_test_setup();
    SessionService::new(Arc::new(fs), Normalizer::default(), &dir.path().join("data"))
}

fn shares(service: &SessionService) -> Vec<(i64, f64)> {
    service
        .current()
        .unwrap()
        .expect("draft present")
        .allocation
        .iter()
        .map(|r| (r.id, r.share))
        .collect()
}

#[test]
fn given_no_draft_when_starting_then_creates_equal_split_on_disk() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    // Act
    let draft = service.start(&[1, 2, 3]).unwrap();

    // Assert
    assert_eq!(draft.entity_ids, vec![1, 2, 3]);
    assert!(temp.path().join("data").join(DRAFT_FILE).exists());
    assert_eq!(shares(&service), vec![(1, 33.0), (2, 33.0), (3, 34.0)]);
}

#[test]
fn given_same_entity_set_when_starting_again_then_keeps_edits() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2, 3]).unwrap();
    service.set_share(1, 50.0).unwrap();

    let draft = service.start(&[1, 2, 3]).unwrap();

    assert_eq!(draft.allocation.get(1), Some(50.0));
}

#[test]
fn given_changed_entity_set_when_starting_then_reinitializes() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2, 3]).unwrap();
    service.set_share(1, 50.0).unwrap();

    let draft = service.start(&[1, 2, 3, 4]).unwrap();

    assert_eq!(draft.entity_ids, vec![1, 2, 3, 4]);
    assert!(draft.allocation.iter().all(|r| r.share == 25.0));
}

#[test]
fn given_draft_when_setting_share_then_persists_rebalanced_allocation() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2, 3, 4]).unwrap();

    service.set_share(2, 55.0).unwrap();

    assert_eq!(shares(&service), vec![(1, 15.0), (2, 55.0), (3, 15.0), (4, 15.0)]);
}

#[test]
fn given_no_draft_when_setting_share_then_no_active_session() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    let result = service.set_share(1, 50.0);

    assert!(matches!(result, Err(ApplicationError::NoActiveSession)));
}

#[test]
fn given_unknown_fund_when_setting_share_then_domain_error() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2]).unwrap();

    let result = service.set_share(7, 50.0);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnknownEntity(7)))
    ));
}

#[test]
fn given_balanced_draft_when_confirming_then_appends_history_and_clears_draft() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[10, 20]).unwrap();
    service.set_share(10, 70.0).unwrap();

    // Act
    let confirmed = service.confirm().unwrap();

    // Assert
    assert_eq!(confirmed.total, 100.0);
    assert_eq!(confirmed.basis_points, vec![(10, 7000), (20, 3000)]);
    assert!(service.current().unwrap().is_none());
    assert!(temp.path().join("data").join(HISTORY_FILE).exists());

    let history = service.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].shares, confirmed.shares);
}

#[test]
fn given_two_confirmations_when_listing_history_then_oldest_first() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2]).unwrap();
    service.confirm().unwrap();
    service.start(&[3]).unwrap();
    service.confirm().unwrap();

    let history = service.history().unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].shares[0].id, 1);
    assert_eq!(history[1].shares[0].id, 3);
    assert_eq!(history[1].shares[0].share, 100.0);
}

#[test]
fn given_unbalanced_draft_when_confirming_then_gate_refuses_and_keeps_draft() {
    // More than 20 funds cannot all hold the 5% minimum within 100%
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    let ids: Vec<i64> = (1..=21).collect();
    service.start(&ids).unwrap();

    let err = service.confirm().unwrap_err();

    assert_eq!(
        err.to_string(),
        "sum must be exactly 100%, current sum is 105%"
    );
    assert!(service.current().unwrap().is_some());
    assert!(service.history().unwrap().is_empty());
}

#[test]
fn given_draft_when_discarding_then_removes_it() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    service.start(&[1, 2]).unwrap();

    assert!(service.discard().unwrap());
    assert!(!service.discard().unwrap());
    assert!(service.current().unwrap().is_none());
}

#[test]
fn given_corrupt_draft_when_reading_then_operation_failed_with_path() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    std::fs::create_dir_all(temp.path().join("data")).unwrap();
    std::fs::write(service.draft_path(), "{not json").unwrap();

    let err = service.current().unwrap_err();

    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
    assert!(err.to_string().contains(DRAFT_FILE), "{}", err);
}

#[test]
fn given_draft_removal_fails_when_confirming_then_history_stays_empty() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let setup = service(&temp);
    setup.start(&[1, 2]).unwrap();
    let service = faulty_service(
        &temp,
        FaultyFileSystem {
            fail_remove: true,
            ..Default::default()
        },
    );

    // Act: confirm twice, as a user retrying would
    assert!(service.confirm().is_err());
    assert!(service.confirm().is_err());

    // Assert
    assert!(service.history().unwrap().is_empty());
    assert!(service.current().unwrap().is_some());
}

#[test]
fn given_history_write_fails_when_confirming_then_draft_is_restored() {
    let temp = TempDir::new().unwrap();
    let setup = service(&temp);
    setup.start(&[1, 2]).unwrap();
    setup.set_share(1, 60.0).unwrap();
    let service = faulty_service(
        &temp,
        FaultyFileSystem {
            fail_history_write: true,
            ..Default::default()
        },
    );

    let err = service.confirm().unwrap_err();

    assert!(err.to_string().contains(HISTORY_FILE), "{}", err);
    assert_eq!(shares(&service), vec![(1, 60.0), (2, 40.0)]);
    assert!(service.history().unwrap().is_empty());

    // retry once the disk is writable again stores exactly one entry
    setup.confirm().unwrap();
    assert_eq!(setup.history().unwrap().len(), 1);
}
