use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::preference::UserPreference;

pub const PENDING_REQUEST_SCHEMA_VERSION: u32 = 1;

/// Queue payload carrying a completed dining request to the fulfillment
/// worker.
///
/// The canonical schema is snake_case with an explicit `schema_version`.
/// Capitalized keys produced by older writers are accepted as aliases so
/// in-flight messages survive the cutover; new payloads are always written
/// in canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    #[serde(default = "schema_version_default")]
    pub schema_version: u32,
    #[serde(default, alias = "Location")]
    pub location: String,
    #[serde(default, alias = "Cuisine")]
    pub cuisine: String,
    #[serde(default, alias = "DiningTime", alias = "Time")]
    pub dining_time: String,
    #[serde(default, alias = "NumberOfPeople", alias = "Partysize")]
    pub number_of_people: String,
    #[serde(default, alias = "Email")]
    pub email: String,
}

fn schema_version_default() -> u32 {
    PENDING_REQUEST_SCHEMA_VERSION
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("pending request is missing required field `{0}`")]
    MissingField(&'static str),
}

impl PendingRequest {
    pub fn new(
        location: impl Into<String>,
        cuisine: impl Into<String>,
        dining_time: impl Into<String>,
        number_of_people: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: PENDING_REQUEST_SCHEMA_VERSION,
            location: location.into(),
            cuisine: cuisine.into(),
            dining_time: dining_time.into(),
            number_of_people: number_of_people.into(),
            email: email.into(),
        }
    }

    pub fn from_preference(preference: &UserPreference) -> Self {
        Self::new(
            preference.location.clone(),
            preference.cuisine.clone(),
            preference.dining_time.clone(),
            preference.number_of_people.clone(),
            preference.email.clone(),
        )
    }

    /// All five request fields must be non-empty before the request may be
    /// enqueued.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        for (name, value) in [
            ("location", &self.location),
            ("cuisine", &self.cuisine),
            ("dining_time", &self.dining_time),
            ("number_of_people", &self.number_of_people),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(RequestValidationError::MissingField(name));
            }
        }
        Ok(())
    }

    /// The worker can still fulfill a partially-populated legacy message as
    /// long as cuisine and the contact email are present.
    pub fn has_fulfillment_fields(&self) -> bool {
        !self.cuisine.trim().is_empty() && !self.email.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_any_empty_field() {
        let mut request = PendingRequest::new("Manhattan", "Italian", "19:00", "2", "a@b.com");
        assert_eq!(request.validate(), Ok(()));

        request.dining_time = "  ".to_string();
        assert_eq!(
            request.validate(),
            Err(RequestValidationError::MissingField("dining_time"))
        );
    }

    #[test]
    fn legacy_capitalized_keys_deserialize_into_canonical_fields() {
        let raw = r#"{
            "Location": "Manhattan",
            "Cuisine": "Chinese",
            "DiningTime": "18:30",
            "NumberOfPeople": "3",
            "Email": "diner@example.com"
        }"#;

        let request: PendingRequest = serde_json::from_str(raw).expect("legacy payload");
        assert_eq!(request.schema_version, PENDING_REQUEST_SCHEMA_VERSION);
        assert_eq!(request.cuisine, "Chinese");
        assert_eq!(request.email, "diner@example.com");
        assert!(request.has_fulfillment_fields());
    }

    #[test]
    fn serialized_form_is_canonical_snake_case() {
        let request = PendingRequest::new("Manhattan", "Indian", "20:00", "2", "a@b.com");
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["dining_time"], "20:00");
        assert!(json.get("DiningTime").is_none());
    }

    #[test]
    fn missing_fields_default_to_empty_instead_of_failing_parse() {
        let request: PendingRequest =
            serde_json::from_str(r#"{"cuisine": "Thai"}"#).expect("partial payload");
        assert_eq!(request.cuisine, "Thai");
        assert!(request.email.is_empty());
        assert!(!request.has_fulfillment_fields());
    }
}
