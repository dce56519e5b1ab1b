mod common;

use common::{drain, Harness};
use passbud_core::session::{AuthErrorKind, DeleteTarget, IntentKind};
use passbud_core::vault::DEFAULT_KEY_ALIAS;
use passbud_core::{BankCard, Credential, CredentialType, KeyStatus, SessionOutcome, VaultError};

fn session_id(context: &passbud_core::session::AuthContext) -> u64 {
    context
        .crypto_object
        .as_ref()
        .map(|crypto_object| crypto_object.session_id())
        .expect("crypto context")
}

#[tokio::test]
async fn test_second_encrypt_request_replaces_first() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    let account_id = harness.vault.create_account("Bank", "Checking").await.unwrap();

    let first = session
        .request_save(Credential::new(&account_id, "PIN", "1111", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("encrypted save needs a prompt");
    let second = session
        .request_save(Credential::new(&account_id, "PUK", "2222", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("encrypted save needs a prompt");
    assert_ne!(session_id(&first), session_id(&second));

    let active = session.active_prompt().expect("one prompt is active");
    assert_eq!(active.intent, IntentKind::Encryption);
    assert_eq!(session_id(&active), session_id(&second));

    let outcome = session.on_auth_succeeded(second.crypto_object.clone()).await;
    let SessionOutcome::Saved { credential } = outcome else {
        panic!("expected a save, got {outcome:?}");
    };
    assert_eq!(credential.key, "PUK");
    assert!(session.active_prompt().is_none());

    let stored = harness.vault.account_credentials(&account_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].key, "PUK");
    assert!(drain(&mut messages).is_empty());
}

#[tokio::test]
async fn test_replaced_crypto_object_is_stale() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    let account_id = harness.vault.create_account("Bank", "Checking").await.unwrap();

    let first = session
        .request_save(Credential::new(&account_id, "PIN", "1111", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("prompt");
    let second = session
        .request_save(Credential::new(&account_id, "PUK", "2222", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("prompt");

    let outcome = session.on_auth_succeeded(first.crypto_object).await;

    assert!(matches!(outcome, SessionOutcome::Failed { .. }));
    assert_eq!(harness.repository.credential_count().await, 0);
    assert_eq!(drain(&mut messages).len(), 1);
    let active = session.active_prompt().expect("second prompt still pending");
    assert_eq!(session_id(&active), session_id(&second));

    let outcome = session.on_auth_succeeded(second.crypto_object).await;
    let SessionOutcome::Saved { credential } = outcome else {
        panic!("expected a save, got {outcome:?}");
    };
    assert_eq!(credential.key, "PUK");
    assert!(session.active_prompt().is_none());
    let stored = harness.vault.account_credentials(&account_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].key, "PUK");
}

#[tokio::test]
async fn test_reveal_targets_credential_by_id_across_reload() {
    let harness = Harness::ready().await;
    let (session, _messages) = harness.session();
    let account_id = harness.vault.create_account("Mail", "Personal").await.unwrap();
    session.load_account(&account_id).await.unwrap();

    let prompt = session
        .request_save(Credential::new(&account_id, "Password", "hunter2", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("prompt");
    let SessionOutcome::Saved { credential } = session.on_auth_succeeded(prompt.crypto_object).await
    else {
        panic!("password was not saved");
    };
    let credential_id = credential.credential_id;

    let prompt = session.request_decrypt(&credential_id).await.unwrap();
    assert_eq!(prompt.intent, IntentKind::Decryption);

    // A plaintext entry sorting first lands while the prompt is up and
    // reloads the list underneath the pending reveal.
    session
        .request_save(Credential::new(&account_id, "Email", "jane@example.com", CredentialType::PlainValue, false))
        .await
        .unwrap();
    let projection = session.projection();
    assert_eq!(projection.credentials.len(), 2);
    assert_eq!(projection.credentials[0].credential.key, "Email");

    let outcome = session.on_auth_succeeded(prompt.crypto_object).await;
    assert_eq!(
        outcome,
        SessionOutcome::Revealed {
            credential_id: credential_id.clone()
        }
    );
    let projection = session.projection();
    let revealed = projection.credential(&credential_id).expect("in projection");
    assert_eq!(revealed.display_value(), "hunter2");
    let email = &projection.credentials[0];
    assert!(!email.is_revealed());

    session.hide_credential(&credential_id);
    assert!(!session
        .projection()
        .credential(&credential_id)
        .expect("in projection")
        .is_revealed());
}

#[tokio::test]
async fn test_delete_waits_for_authentication() {
    let harness = Harness::ready().await;
    let (session, _messages) = harness.session();
    let account_id = harness.vault.create_account("Old", "Unused").await.unwrap();

    let prompt = session.request_delete(true, &account_id);
    assert_eq!(prompt.intent, IntentKind::Deletion);
    assert!(prompt.crypto_object.is_none());
    assert!(harness.vault.account_details(&account_id).await.unwrap().is_some());

    let outcome = session.on_auth_succeeded(None).await;

    assert_eq!(
        outcome,
        SessionOutcome::Deleted {
            target: DeleteTarget::Account {
                account_id: account_id.clone()
            }
        }
    );
    assert!(harness.vault.account_details(&account_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_discards_intent_silently() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    let account_id = harness.vault.create_account("Bank", "Checking").await.unwrap();
    session
        .request_save(Credential::new(&account_id, "PIN", "4321", CredentialType::PlainValue, true))
        .await
        .unwrap()
        .expect("prompt");
    let writes = harness.repository.write_count();

    let kind = session.on_auth_error(13, "Cancel");

    assert_eq!(kind, AuthErrorKind::NegativeButton);
    assert!(session.active_prompt().is_none());
    assert!(drain(&mut messages).is_empty());
    assert_eq!(harness.repository.write_count(), writes);
    assert_eq!(
        session.on_auth_succeeded(None).await,
        SessionOutcome::NoPendingIntent
    );
}

#[tokio::test]
async fn test_lockout_is_reported() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    let _ = session.request_delete(false, "missing");

    let kind = session.on_auth_error(7, "Too many attempts");

    assert_eq!(kind, AuthErrorKind::Lockout);
    assert_eq!(drain(&mut messages), vec!["Too many attempts".to_string()]);
}

#[tokio::test]
async fn test_account_with_login() {
    let harness = Harness::ready().await;
    let (session, _messages) = harness.session();

    let prompt = session
        .create_account_with_login("Mail", "Personal", "jane", "hunter2")
        .await
        .unwrap();
    let accounts = harness.vault.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    let account_id = accounts[0].account_id.clone();
    assert_eq!(harness.vault.account_credentials(&account_id).await.unwrap().len(), 1);

    let SessionOutcome::Saved { credential } = session.on_auth_succeeded(prompt.crypto_object).await
    else {
        panic!("password was not saved");
    };
    assert_eq!(credential.key, "Password");
    assert!(credential.is_encrypted);
    assert_ne!(credential.value, "hunter2");

    let stored = harness.vault.account_credentials(&account_id).await.unwrap();
    let keys: Vec<_> = stored.iter().map(|credential| credential.key.as_str()).collect();
    assert_eq!(keys, ["Password", "Username"]);
    assert_eq!(stored[1].value, "jane");
    assert!(!stored[1].is_encrypted);
}

#[tokio::test]
async fn test_account_with_card() {
    let harness = Harness::ready().await;
    let (session, _messages) = harness.session();
    let card = BankCard {
        card_number: "4111111111111111".to_string(),
        valid_from: None,
        valid_thru: Some("1229".to_string()),
        cvv: Some("123".to_string()),
    };

    let prompt = session
        .create_account_with_card("Wallet", "Visa", &card)
        .await
        .unwrap();
    let SessionOutcome::Saved { credential } = session.on_auth_succeeded(prompt.crypto_object).await
    else {
        panic!("card was not saved");
    };
    assert_eq!(credential.credential_type, CredentialType::BankCard);
    assert!(credential.is_encrypted);

    let account = harness
        .vault
        .account_details(&credential.account_id)
        .await
        .unwrap()
        .expect("account");
    assert_eq!(account.name, "Wallet");
    assert_eq!(account.description, "");

    let counts = harness.vault.accounts_with_counts().await.unwrap();
    assert_eq!(counts[0].cards_count, 1);
}

#[tokio::test]
async fn test_startup_reports_reset_after_invalidation() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    harness.vault.create_account("Bank", "Checking").await.unwrap();

    assert!(harness.keystore.invalidate_key(DEFAULT_KEY_ALIAS));
    let info = session.check_biometrics().await.unwrap();

    assert_eq!(info.key_status, KeyStatus::Invalidated);
    assert_eq!(
        drain(&mut messages),
        vec!["Your key was invalidated and app data is reset".to_string()]
    );
    assert!(harness.vault.list_accounts().await.unwrap().is_empty());

    let info = session.check_biometrics().await.unwrap();
    assert_eq!(info.key_status, KeyStatus::Ready);
    assert!(drain(&mut messages).is_empty());
}

#[tokio::test]
async fn test_card_with_delimiter_is_rejected_before_writing() {
    let harness = Harness::ready().await;
    let (session, mut messages) = harness.session();
    let card = BankCard {
        card_number: "4111|||1111".to_string(),
        valid_from: None,
        valid_thru: Some("1229".to_string()),
        cvv: Some("123".to_string()),
    };
    let writes = harness.repository.write_count();

    let result = session.create_account_with_card("Wallet", "Visa", &card).await;

    assert!(matches!(
        result,
        Err(VaultError::InvalidInput { ref parameter, .. }) if parameter == "card_number"
    ));
    assert_eq!(drain(&mut messages).len(), 1);
    assert_eq!(harness.repository.write_count(), writes);
    assert!(harness.vault.list_accounts().await.unwrap().is_empty());
    assert!(matches!(
        session.on_auth_succeeded(None).await,
        SessionOutcome::NoPendingIntent
    ));
}
