use crate::error::Result;
use domain::CommunityId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};

/// One community's share of an in-memory index.
///
/// `data` is hydrated at most once; concurrent first readers wait on the same
/// load. `writer` serialises mutations so readers never block on each other.
pub(crate) struct Slot<T> {
    community: CommunityId,
    data: OnceCell<RwLock<T>>,
    pub(crate) writer: Mutex<()>,
}

impl<T> Slot<T> {
    fn new(community: CommunityId) -> Self {
        Self {
            community,
            data: OnceCell::new(),
            writer: Mutex::new(()),
        }
    }

    pub(crate) async fn data<F, Fut>(&self, load: F) -> Result<&RwLock<T>>
    where
        F: FnOnce(CommunityId) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.data
            .get_or_try_init(|| async { load(self.community).await.map(RwLock::new) })
            .await
    }
}

/// Lazily created slots keyed by community. Never evicted.
pub(crate) struct PartitionMap<T> {
    slots: RwLock<HashMap<CommunityId, Arc<Slot<T>>>>,
}

impl<T> PartitionMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn slot(&self, community: CommunityId) -> Arc<Slot<T>> {
        if let Some(slot) = self.slots.read().await.get(&community) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(community)
            .or_insert_with(|| Arc::new(Slot::new(community)))
            .clone()
    }
}
