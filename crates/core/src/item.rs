//! Catalog items and change batches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a catalog item, unique within the catalog
pub type ItemId = i64;

/// A resource surfaced by the remote catalog
///
/// Items are immutable once fetched. `metadata` is opaque to the poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// When the catalog registered the item, if it reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Item {
    /// Create an item with no metadata
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            added_at: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Items from one fetch that had not been seen before, in catalog order
pub type ChangeBatch = Vec<Item>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_deserializes_without_optional_fields() {
        let item: Item = serde_json::from_value(json!({ "id": 7 })).unwrap();
        assert_eq!(item, Item::new(7));
    }

    #[test]
    fn test_item_keeps_metadata_verbatim() {
        let item: Item = serde_json::from_value(json!({
            "id": 3,
            "added_at": "2024-05-01T12:00:00Z",
            "metadata": { "title": "clip.mp4", "size": 1024 }
        }))
        .unwrap();

        assert_eq!(item.metadata["title"], "clip.mp4");
        assert_eq!(
            item.added_at.unwrap().to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }
}
