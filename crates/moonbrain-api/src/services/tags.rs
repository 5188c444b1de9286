//! Service for the global tag set.

use std::collections::BTreeSet;
use std::sync::Arc;

use moonbrain_core::{Result, TagRepository};
use tracing::debug;

#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.tags
            .list_all()
            .await
            .map_err(|e| e.context("tag service: get all tags"))
    }

    /// Add the distinct non-blank names in `tags` to the tag set.
    pub async fn upsert<I, S>(&self, tags: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: Vec<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if unique.is_empty() {
            return Ok(0);
        }

        debug!(
            subsystem = "service",
            component = "tag_service",
            op = "upsert",
            batch_size = unique.len(),
            "Upserting tags"
        );
        self.tags
            .bulk_upsert(&unique)
            .await
            .map_err(|e| e.context("tag service: bulk upsert"))?;
        Ok(unique.len())
    }
}
