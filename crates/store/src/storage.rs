use crate::{migrate, BridgeStore, StoreError};

use bridge_history_db::{Database, DatabaseOperations, Snapshot};
use bridge_history_primitives::Network;

/// Loads and saves the persisted state of a network.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc)]
pub trait SnapshotStorage: Send + Sync {
    /// Loads the store of the network, migrating older payloads. A missing snapshot yields an
    /// empty store.
    async fn load(&self, network: Network) -> Result<BridgeStore, StoreError>;

    /// Saves the snapshot.
    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl SnapshotStorage for Database {
    async fn load(&self, network: Network) -> Result<BridgeStore, StoreError> {
        let Some(snapshot) = self.get_snapshot(network.storage_key()).await? else {
            tracing::debug!(target: "bridge_history::store", %network, "no snapshot found, starting empty");
            return Ok(BridgeStore::new(network))
        };

        let value = serde_json::from_str(&snapshot.payload)?;
        let state = migrate(value)?;
        let store = BridgeStore::from_persisted(network, state);
        tracing::info!(target: "bridge_history::store", %network, entries = store.total_entries(), "loaded store");

        Ok(store)
    }

    async fn save(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        Ok(self.upsert_snapshot(snapshot).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, TxHash};
    use bridge_history_db::test_utils::setup_test_db;
    use bridge_history_primitives::{OrderedIndexEntry, TxDirection, TxPosition};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_missing_snapshot_is_empty() -> eyre::Result<()> {
        let db = setup_test_db().await;
        let store = db.load(Network::Mainnet).await?;
        assert_eq!(store.total_entries(), 0);
        assert_eq!(store.network(), Network::Mainnet);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load_partitioned_by_network() -> eyre::Result<()> {
        let db = Arc::new(setup_test_db().await);
        let wallet = Address::with_last_byte(1);

        let mut mainnet = BridgeStore::new(Network::Mainnet);
        mainnet.append(
            wallet,
            OrderedIndexEntry::new(TxHash::with_last_byte(1), 1, TxPosition::Frontend, TxDirection::Deposit),
        );
        db.save(mainnet.snapshot()?).await?;

        let restored = db.load(Network::Mainnet).await?;
        assert_eq!(restored.wallet_entries(&wallet), mainnet.wallet_entries(&wallet));
        assert_eq!(db.load(Network::Testnet).await?.total_entries(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_migrates_legacy_snapshot() -> eyre::Result<()> {
        let db = setup_test_db().await;
        let wallet = Address::with_last_byte(7);
        let payload = serde_json::json!({
            "orderedTxDB": {
                (wallet.to_string()): [
                    { "hash": TxHash::with_last_byte(1), "timestamp": 5, "position": "BACKEND", "direction": "WITHDRAW" }
                ]
            }
        });
        db.upsert_snapshot(Snapshot {
            key: Network::Testnet.storage_key().to_owned(),
            version: 1,
            payload: payload.to_string(),
            updated_at: 0,
        })
        .await?;

        let store = db.load(Network::Testnet).await?;
        assert_eq!(store.wallet_entries(&wallet).len(), 1);
        assert_eq!(store.wallet_entries(&wallet)[0].position, TxPosition::Backend);
        Ok(())
    }
}
