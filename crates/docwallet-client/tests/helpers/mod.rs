//! Test helpers: build a wallet over the in-memory gateway.
//!
//! Run from workspace root: `cargo test -p docwallet-client`.

#![allow(dead_code)]

pub mod fixtures;
pub mod sinks;

use docwallet_client::WalletContext;
use docwallet_core::WalletConfig;
use docwallet_gateway::{InMemoryGateway, StorageGateway};
use std::sync::Arc;

pub const TEST_EMAIL: &str = "ada@example.com";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Wallet plus a handle on its gateway for failure injection and inspection.
pub struct TestWallet {
    pub gateway: Arc<InMemoryGateway>,
    pub ctx: WalletContext,
}

/// Wallet with nobody signed in.
pub async fn setup_wallet() -> TestWallet {
    let gateway = Arc::new(InMemoryGateway::new());
    let ctx = WalletContext::init(WalletConfig::memory(), gateway.clone())
        .await
        .expect("wallet init");
    TestWallet { gateway, ctx }
}

/// Wallet with a freshly registered, signed-in user.
pub async fn setup_signed_in_wallet() -> TestWallet {
    let wallet = setup_wallet().await;
    wallet
        .ctx
        .session()
        .sign_up(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("sign up");
    wallet
        .ctx
        .sign_in(TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("sign in");
    wallet
}

/// Register a user directly on the gateway, leaving them signed in there.
pub async fn register_on_gateway(gateway: &InMemoryGateway) {
    gateway
        .sign_up(
            &docwallet_core::models::Credentials::new(TEST_EMAIL, TEST_PASSWORD),
            &docwallet_core::models::SignUpOptions::default(),
        )
        .await
        .expect("gateway sign up");
}
