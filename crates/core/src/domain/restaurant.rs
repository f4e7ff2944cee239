use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External business identifier for a restaurant, the primary key of the
/// authoritative record store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessId(pub String);

/// Authoritative restaurant record. Populated externally; this system only
/// reads it (directly for detail lookups, and via the index builder's scan).
#[derive(Clone, Debug, PartialEq)]
pub struct RestaurantRecord {
    pub business_id: BusinessId,
    pub name: String,
    pub address: String,
    pub cuisine: String,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub zip_code: Option<String>,
    pub inserted_at: DateTime<Utc>,
}

/// Secondary-index entry mapping a cuisine to one candidate restaurant.
/// Entries are not unique per restaurant; rebuilding the index appends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchIndexEntry {
    pub business_id: BusinessId,
    pub cuisine: String,
}
