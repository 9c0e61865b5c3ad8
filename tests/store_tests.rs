//! Persistence integration tests: typed stores over the encrypted file
//! storage, across restarts and key mismatches.

mod support;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use attune::error::{SecureStorageError, StorageError, StoreError};
use attune::session::AuthSession;
use attune::storage::EncryptedFileStorage;
use attune::store::{SessionStore, TokenStore};

use support::token;

fn vault(dir: &TempDir, key: &[u8]) -> Arc<EncryptedFileStorage> {
    Arc::new(EncryptedFileStorage::new(dir.path().join("vault.json"), key).unwrap())
}

#[tokio::test]
async fn credential_survives_a_restart_with_the_same_key() {
    let dir = TempDir::new().unwrap();
    let key = EncryptedFileStorage::generate_key();

    let store = TokenStore::new(vault(&dir, &key));
    store.save(&token("ACCESS_TOKEN", Some("REFRESH_TOKEN"))).await.unwrap();
    drop(store);

    // New storage instance over the same file, as after a process restart.
    let store = TokenStore::new(vault(&dir, &key));
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.access_token, "ACCESS_TOKEN");
    assert_eq!(loaded.refresh_token.as_deref(), Some("REFRESH_TOKEN"));
}

#[tokio::test]
async fn refresh_inheritance_holds_across_restarts() {
    let dir = TempDir::new().unwrap();
    let key = EncryptedFileStorage::generate_key();

    let store = TokenStore::new(vault(&dir, &key));
    store.save(&token("first", Some("KEEP_ME"))).await.unwrap();
    drop(store);

    let store = TokenStore::new(vault(&dir, &key));
    store.save(&token("second", None)).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.refresh_token.as_deref(), Some("KEEP_ME"));
}

#[tokio::test]
async fn wrong_key_surfaces_decryption_failure_not_absence() {
    let dir = TempDir::new().unwrap();

    let store = TokenStore::new(vault(&dir, &EncryptedFileStorage::generate_key()));
    store.save(&token("acc", Some("ref"))).await.unwrap();
    drop(store);

    let store = TokenStore::new(vault(&dir, &EncryptedFileStorage::generate_key()));
    let err = store.load().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Secure(SecureStorageError::DecryptionFailed(_))
    ));
}

#[tokio::test]
async fn session_and_token_slots_are_independent() {
    let dir = TempDir::new().unwrap();
    let key = EncryptedFileStorage::generate_key();
    let storage = vault(&dir, &key);

    let sessions = SessionStore::new(storage.clone());
    let tokens = TokenStore::new(storage);

    sessions.save(&AuthSession::new("VERIFIER", "STATE")).await.unwrap();
    tokens.save(&token("acc", Some("ref"))).await.unwrap();

    sessions.clear().await.unwrap();

    let err = sessions.load().await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(StorageError::NotFound)));
    // Clearing the session never touches the credential.
    assert_eq!(tokens.load().await.unwrap().access_token, "acc");
}

#[tokio::test]
async fn empty_vault_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let store = TokenStore::new(vault(&dir, &EncryptedFileStorage::generate_key()));
    let err = store.load().await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(StorageError::NotFound)));
}
