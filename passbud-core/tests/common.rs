//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use passbud_core::crypto::SoftwareKeystore;
use passbud_core::repository::MemoryRepository;
use passbud_core::vault::{AuthenticatorAvailability, BiometricCapability};
use passbud_core::{ChannelMessageSink, CredentialVault, CryptoSession, UiMessage, VaultConfig};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct StubBiometrics(pub AuthenticatorAvailability);

impl BiometricCapability for StubBiometrics {
    fn can_authenticate(&self) -> AuthenticatorAvailability {
        self.0
    }
}

pub struct Harness {
    pub keystore: Arc<SoftwareKeystore>,
    pub repository: Arc<MemoryRepository>,
    pub vault: Arc<CredentialVault>,
}

impl Harness {
    pub fn new() -> Self {
        let keystore = Arc::new(SoftwareKeystore::new());
        let repository = Arc::new(MemoryRepository::new());
        let vault = Arc::new(CredentialVault::new(
            &VaultConfig::default(),
            keystore.clone(),
            repository.clone(),
            Arc::new(StubBiometrics(AuthenticatorAvailability::Success)),
        ));
        Self {
            keystore,
            repository,
            vault,
        }
    }

    /// A vault that has already gone through the startup check.
    pub async fn ready() -> Self {
        let harness = Self::new();
        harness.vault.biometric_info().await.expect("startup check");
        harness
    }

    pub fn session(&self) -> (CryptoSession, UnboundedReceiver<UiMessage>) {
        let (sink, messages) = ChannelMessageSink::channel();
        (CryptoSession::new(self.vault.clone(), Arc::new(sink)), messages)
    }
}

/// Drains every message delivered so far.
pub fn drain(messages: &mut UnboundedReceiver<UiMessage>) -> Vec<String> {
    let mut texts = Vec::new();
    while let Ok(message) = messages.try_recv() {
        texts.push(message.text);
    }
    texts
}
