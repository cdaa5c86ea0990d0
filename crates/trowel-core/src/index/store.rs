use async_trait::async_trait;

use crate::error::Result;

use super::{IndexBuilder, IndexItem, IndexKey};

/// Key-range queryable index storage
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Builder describing which indexes this store maintains
    fn index_builder(&self) -> &IndexBuilder;

    fn has_index(&self, name: &str) -> bool {
        self.index_builder().has_index(name)
    }

    /// Items of `index` whose keys lie in `start..=end`, in key order
    async fn query_index(
        &self,
        index: &str,
        start: &IndexKey,
        end: &IndexKey,
    ) -> Result<Vec<IndexItem>>;
}
