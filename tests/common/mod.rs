#![allow(dead_code)]

use std::{
    sync::{Arc, Once},
    time::Duration,
};

use alloy::{
    primitives::{Address, B256, address, b256},
    rpc::types::Log,
};
use chain_publisher::{
    ChainPublisher, ChainPublisherBuilder,
    provider_pool::ProviderPoolBuilder,
    storage::{LogStorage, MemoryStorage},
    subscriber::{FilterClause, SubscriberSpec},
    test_utils::{CollectingReducer, FixtureProvider, make_log},
};
use tracing_subscriber::EnvFilter;

pub const TOKEN: Address = address!("0x00000000000000000000000000000000000000aa");
pub const OTHER: Address = address!("0x00000000000000000000000000000000000000bb");
pub const TRANSFER: B256 =
    b256!("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
pub const APPROVAL: B256 =
    b256!("0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925");

/// Transfers of `TOKEN` at 99, 105 (twice), 120, 140 and 145, plus noise from `OTHER` and an
/// `APPROVAL` of `TOKEN`.
pub fn default_chain() -> Vec<Log> {
    vec![
        make_log(TOKEN, &[TRANSFER], 99, 0),
        make_log(TOKEN, &[TRANSFER], 105, 0),
        make_log(TOKEN, &[TRANSFER], 105, 1),
        make_log(OTHER, &[TRANSFER], 110, 0),
        make_log(TOKEN, &[TRANSFER], 120, 3),
        make_log(TOKEN, &[APPROVAL], 130, 0),
        make_log(TOKEN, &[TRANSFER], 140, 0),
        make_log(TOKEN, &[TRANSFER], 145, 2),
    ]
}

pub fn token_transfers() -> FilterClause {
    FilterClause::new().address(TOKEN).event(TRANSFER)
}

/// A subscriber to `TOKEN` transfers from block 100 with a safe depth of 10.
pub fn transfers_spec(key: &str, reducer: CollectingReducer) -> SubscriberSpec {
    SubscriberSpec::new(key).filter(token_transfers()).genesis(100).safe_depth(10).reducer(reducer)
}

/// Print publisher logs during tests; `RUST_LOG=chain_publisher=debug` turns them up.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct PublisherSetup<S> {
    pub publisher: ChainPublisher,
    pub provider: FixtureProvider,
    pub storage: Arc<S>,
}

pub async fn setup_publisher(chain: Vec<Log>) -> anyhow::Result<PublisherSetup<MemoryStorage>> {
    setup_publisher_with(chain, Arc::new(MemoryStorage::new()), |builder| builder).await
}

/// Publisher over a [`FixtureProvider`] serving `chain`, without head tracking and with short
/// loop delays. `configure` can adjust the builder before it is built.
pub async fn setup_publisher_with<S>(
    chain: Vec<Log>,
    storage: Arc<S>,
    configure: impl FnOnce(ChainPublisherBuilder) -> ChainPublisherBuilder,
) -> anyhow::Result<PublisherSetup<S>>
where
    S: LogStorage + 'static,
{
    init_tracing();
    let provider = FixtureProvider::new(chain);
    let pool = ProviderPoolBuilder::new().provider(provider.clone()).max_retries(0).build().await?;
    let builder = ChainPublisherBuilder::new()
        .provider_pool(pool)
        .storage(Arc::clone(&storage))
        .track_heads(false)
        .idle_delay(Duration::from_millis(10))
        .stalled_delay(Duration::from_millis(10))
        .error_delay(Duration::from_millis(10));
    let publisher = configure(builder).build()?;
    Ok(PublisherSetup { publisher, provider, storage })
}
