//! Wire types for the dialogue fulfillment protocol.
//!
//! Each conversational turn is stateless: everything the fulfiller needs to
//! resume a dialogue (slot values, the confirmation sub-state) travels inside
//! the request and is handed back in the response. The caller-managed
//! `SessionAttributes` object is the only cross-turn carrier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntentName {
    Greeting,
    ThankYou,
    DiningSuggestions,
    Unknown(String),
}

impl IntentName {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "GreetingIntent" => Self::Greeting,
            "ThankYouIntent" => Self::ThankYou,
            "DiningSuggestionsIntent" => Self::DiningSuggestions,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Greeting => "GreetingIntent",
            Self::ThankYou => "ThankYouIntent",
            Self::DiningSuggestions => "DiningSuggestionsIntent",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for IntentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SlotName {
    Location,
    Cuisine,
    Time,
    Partysize,
    Email,
}

/// Elicitation order for fresh collection. Fixed; the fulfiller always asks
/// for the first missing slot in this order.
pub const REQUIRED_SLOTS: [SlotName; 5] = [
    SlotName::Location,
    SlotName::Cuisine,
    SlotName::Time,
    SlotName::Partysize,
    SlotName::Email,
];

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Cuisine => "Cuisine",
            Self::Time => "Time",
            Self::Partysize => "Partysize",
            Self::Email => "Email",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot map for one turn. Absent and empty values are both treated as
/// "not collected yet".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slots(BTreeMap<SlotName, Option<String>>);

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: SlotName) -> Option<&str> {
        self.0
            .get(&slot)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn set(&mut self, slot: SlotName, value: impl Into<String>) {
        self.0.insert(slot, Some(value.into()));
    }

    pub fn first_missing(&self) -> Option<SlotName> {
        REQUIRED_SLOTS.into_iter().find(|slot| self.get(*slot).is_none())
    }

    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }
}

/// Confirmation sub-state for the "repeat last search" sub-dialogue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationState {
    #[default]
    NotAsked,
    Asked,
    Accepted,
    Denied,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttributes {
    #[serde(default)]
    pub confirmation_state: ConfirmationState,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueRequest {
    pub session_id: String,
    pub intent: String,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub session_attributes: SessionAttributes,
    /// Latest raw user utterance, used to interpret confirmation replies.
    #[serde(default)]
    pub transcript: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DialogAction {
    Close,
    ElicitSlot {
        #[serde(rename = "slotToElicit")]
        slot_to_elicit: SlotName,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    InProgress,
    Fulfilled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseIntent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<IntentState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Slots>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueResponse {
    pub dialog_action: DialogAction,
    pub intent: ResponseIntent,
    pub session_attributes: SessionAttributes,
    pub session_id: String,
    pub messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_elicitation_order_is_fixed() {
        let mut slots = Slots::new();
        assert_eq!(slots.first_missing(), Some(SlotName::Location));

        slots.set(SlotName::Location, "Manhattan");
        assert_eq!(slots.first_missing(), Some(SlotName::Cuisine));

        slots.set(SlotName::Cuisine, "Italian");
        slots.set(SlotName::Time, "19:00");
        slots.set(SlotName::Partysize, "4");
        assert_eq!(slots.first_missing(), Some(SlotName::Email));

        slots.set(SlotName::Email, "diner@example.com");
        assert!(slots.is_complete());
    }

    #[test]
    fn empty_slot_values_count_as_missing() {
        let mut slots = Slots::new();
        slots.set(SlotName::Location, "   ");
        assert_eq!(slots.get(SlotName::Location), None);
        assert_eq!(slots.first_missing(), Some(SlotName::Location));
    }

    #[test]
    fn slots_round_trip_as_plain_json_map() {
        let mut slots = Slots::new();
        slots.set(SlotName::Cuisine, "Chinese");

        let json = serde_json::to_value(&slots).expect("serialize slots");
        assert_eq!(json["Cuisine"], "Chinese");

        let parsed: Slots =
            serde_json::from_value(serde_json::json!({"Cuisine": "Chinese", "Time": null}))
                .expect("deserialize slots");
        assert_eq!(parsed.get(SlotName::Cuisine), Some("Chinese"));
        assert_eq!(parsed.get(SlotName::Time), None);
    }

    #[test]
    fn confirmation_state_defaults_to_not_asked() {
        let attributes: SessionAttributes = serde_json::from_str("{}").expect("empty attributes");
        assert_eq!(attributes.confirmation_state, ConfirmationState::NotAsked);
    }

    #[test]
    fn unknown_intent_round_trips_its_raw_name() {
        let intent = IntentName::parse("BookFlightIntent");
        assert_eq!(intent, IntentName::Unknown("BookFlightIntent".to_string()));
        assert_eq!(intent.as_str(), "BookFlightIntent");
    }
}
