//! Mock signer for testing
//!
//! Wraps a real [`LocalWallet`] so signatures still verify, but lets tests
//! script wallet behaviour: rejections, disconnection, and holding a request
//! open until the test releases it (to exercise stale-result discard).

use super::traits::*;
use super::wallet::LocalWallet;
use crate::account::AccountId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// How the mock answers the next sign requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Sign with the wrapped wallet
    Approve,
    /// Holder dismisses the prompt
    Reject(String),
    /// Wallet is gone
    Disconnected,
}

/// A sign request as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignCall {
    pub content: String,
    pub account: AccountId,
}

/// Mock signer for testing
#[derive(Clone)]
pub struct MockSigner {
    wallet: LocalWallet,
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
}

struct MockState {
    behavior: MockBehavior,
    calls: Vec<SignCall>,
}

impl MockSigner {
    /// Create a mock that approves every request with a fresh key
    pub fn new() -> Self {
        Self::with_wallet(LocalWallet::random())
    }

    /// Create a mock around a specific wallet
    pub fn with_wallet(wallet: LocalWallet) -> Self {
        Self {
            wallet,
            state: Arc::new(Mutex::new(MockState {
                behavior: MockBehavior::Approve,
                calls: Vec::new(),
            })),
            gate: None,
        }
    }

    /// Hold every sign request until [`release`](Self::release) is called
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let one held request complete
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Change how subsequent requests are answered
    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.state.lock().unwrap().behavior = behavior;
    }

    /// Sign requests received so far
    pub fn calls(&self) -> Vec<SignCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Wrapped wallet's address
    pub fn address(&self) -> AccountId {
        self.wallet.address()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn account(&self) -> Option<AccountId> {
        match self.state.lock().unwrap().behavior {
            MockBehavior::Disconnected => None,
            _ => Some(self.wallet.address()),
        }
    }

    async fn sign(&self, content: &str, account: &AccountId) -> SignerResult<String> {
        self.state.lock().unwrap().calls.push(SignCall {
            content: content.to_string(),
            account: account.clone(),
        });

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| SignerError::Connection("mock gate closed".to_string()))?;
            permit.forget();
        }

        let behavior = self.state.lock().unwrap().behavior.clone();
        match behavior {
            MockBehavior::Approve => self.wallet.sign(content, account).await,
            MockBehavior::Reject(reason) => Err(SignerError::Rejected(reason)),
            MockBehavior::Disconnected => {
                Err(SignerError::Connection("wallet disconnected".to_string()))
            }
        }
    }
}
