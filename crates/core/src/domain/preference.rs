use chrono::{DateTime, Utc};

/// A user's last completed dining search, keyed by contact email.
///
/// Overwritten on every completed request (last-writer-wins, no optimistic
/// locking). `restaurant_names` is populated by the fulfillment worker after
/// recommendations have been resolved; it is absent for a search that has
/// not been fulfilled yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserPreference {
    pub email: String,
    pub location: String,
    pub cuisine: String,
    pub dining_time: String,
    pub number_of_people: String,
    pub restaurant_names: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}
