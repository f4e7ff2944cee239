use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use concierge_core::domain::dialogue::{
    ConfirmationState, DialogAction, DialogueRequest, DialogueResponse, IntentName, IntentState,
    ResponseIntent, SessionAttributes, SlotName, Slots,
};
use concierge_core::domain::preference::UserPreference;
use concierge_core::domain::request::{PendingRequest, RequestValidationError};
use concierge_db::repositories::{PreferenceRepository, RepositoryError, RequestQueue};

const GREETING_MESSAGE: &str = "Hi there, how can I help?";
const THANK_YOU_MESSAGE: &str = "You are welcome! Feel free to ask anything else.";
const REUSED_SEARCH_MESSAGE: &str =
    "Thank you! You will receive an email with your previous dining suggestions shortly.";
const NEW_SEARCH_MESSAGE: &str =
    "Thank you! You will receive an email with new dining suggestions shortly.";

const AFFIRMATIVE_REPLIES: [&str; 4] = ["yes", "yeah", "sure", "okay"];

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("invalid intent `{0}`")]
    InvalidIntent(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    IncompleteRequest(#[from] RequestValidationError),
}

/// Stateless per-turn dialogue handler.
///
/// A turn either closes the dialogue (canned reply or completed request) or
/// elicits exactly one slot. The confirmation sub-dialogue for reusing the
/// previous search spans two turns; its state travels in the session
/// attributes the caller passes back on the next turn.
pub struct DialogueFulfiller<P, Q> {
    preferences: P,
    queue: Q,
}

impl<P, Q> DialogueFulfiller<P, Q>
where
    P: PreferenceRepository,
    Q: RequestQueue,
{
    pub fn new(preferences: P, queue: Q) -> Self {
        Self { preferences, queue }
    }

    pub async fn handle(&self, request: DialogueRequest) -> Result<DialogueResponse, DialogueError> {
        match IntentName::parse(&request.intent) {
            IntentName::Greeting => Ok(close(&request, IntentName::Greeting, None, GREETING_MESSAGE)),
            IntentName::ThankYou => {
                Ok(close(&request, IntentName::ThankYou, None, THANK_YOU_MESSAGE))
            }
            IntentName::DiningSuggestions => self.handle_dining_suggestions(request).await,
            IntentName::Unknown(name) => Err(DialogueError::InvalidIntent(name)),
        }
    }

    async fn handle_dining_suggestions(
        &self,
        request: DialogueRequest,
    ) -> Result<DialogueResponse, DialogueError> {
        let mut slots = request.slots.clone();
        let mut attributes = request.session_attributes.clone();

        // The contact email is the preference key, so it is collected before
        // anything else.
        let Some(email) = slots.get(SlotName::Email).map(str::to_string) else {
            let prompt = elicit_prompt(SlotName::Email);
            return Ok(elicit(&request.session_id, SlotName::Email, slots, attributes, &prompt));
        };

        // A failed lookup degrades to "no stored preference" rather than
        // failing the turn; the user just goes through fresh collection.
        let previous = match self.preferences.find_by_email(&email).await {
            Ok(found) => found,
            Err(error) => {
                warn!(
                    event_name = "dialogue.preference_lookup_failed",
                    contact = %email,
                    error = %error,
                    "preference lookup failed; collecting fresh slots"
                );
                None
            }
        };

        if let Some(previous) = previous {
            match attributes.confirmation_state {
                ConfirmationState::NotAsked => {
                    attributes.confirmation_state = ConfirmationState::Asked;
                    let prompt = confirmation_prompt(&previous);
                    // Location doubles as the carrier slot for the yes/no
                    // reply, mirroring the first slot of fresh collection.
                    return Ok(elicit(
                        &request.session_id,
                        SlotName::Location,
                        slots,
                        attributes,
                        &prompt,
                    ));
                }
                ConfirmationState::Asked => {
                    if is_affirmative(&request.transcript) {
                        attributes.confirmation_state = ConfirmationState::Accepted;
                        slots.set(SlotName::Location, previous.location.clone());
                        slots.set(SlotName::Cuisine, previous.cuisine.clone());
                        slots.set(SlotName::Time, previous.dining_time.clone());
                        slots.set(SlotName::Partysize, previous.number_of_people.clone());

                        let pending = PendingRequest::from_preference(&previous);
                        pending.validate()?;
                        let message_id = self.queue.enqueue(&pending).await?;
                        info!(
                            event_name = "dialogue.request_enqueued",
                            contact = %email,
                            cuisine = %pending.cuisine,
                            message_id = %message_id,
                            reused_previous_search = true,
                            "pending request enqueued from stored preference"
                        );

                        return Ok(close(
                            &DialogueRequest { session_attributes: attributes, slots, ..request },
                            IntentName::DiningSuggestions,
                            None,
                            REUSED_SEARCH_MESSAGE,
                        ));
                    }

                    attributes.confirmation_state = ConfirmationState::Denied;
                }
                ConfirmationState::Accepted | ConfirmationState::Denied => {}
            }
        }

        self.collect_fresh_slots(&request.session_id, &email, slots, attributes).await
    }

    async fn collect_fresh_slots(
        &self,
        session_id: &str,
        email: &str,
        slots: Slots,
        attributes: SessionAttributes,
    ) -> Result<DialogueResponse, DialogueError> {
        if let Some(missing) = slots.first_missing() {
            let prompt = elicit_prompt(missing);
            return Ok(elicit(session_id, missing, slots, attributes, &prompt));
        }

        let pending = pending_from_slots(&slots, email);
        pending.validate()?;

        let preference = UserPreference {
            email: email.to_string(),
            location: pending.location.clone(),
            cuisine: pending.cuisine.clone(),
            dining_time: pending.dining_time.clone(),
            number_of_people: pending.number_of_people.clone(),
            restaurant_names: None,
            updated_at: Utc::now(),
        };
        self.preferences.save(preference).await?;

        let message_id = self.queue.enqueue(&pending).await?;
        info!(
            event_name = "dialogue.request_enqueued",
            contact = %email,
            cuisine = %pending.cuisine,
            message_id = %message_id,
            reused_previous_search = false,
            "pending request enqueued from fresh slots"
        );

        Ok(DialogueResponse {
            dialog_action: DialogAction::Close,
            intent: ResponseIntent {
                name: IntentName::DiningSuggestions.as_str().to_string(),
                state: Some(IntentState::Fulfilled),
                slots: Some(slots),
            },
            session_attributes: attributes,
            session_id: session_id.to_string(),
            messages: vec![NEW_SEARCH_MESSAGE.to_string()],
        })
    }
}

fn pending_from_slots(slots: &Slots, email: &str) -> PendingRequest {
    PendingRequest::new(
        slots.get(SlotName::Location).unwrap_or_default(),
        slots.get(SlotName::Cuisine).unwrap_or_default(),
        slots.get(SlotName::Time).unwrap_or_default(),
        slots.get(SlotName::Partysize).unwrap_or_default(),
        email,
    )
}

fn is_affirmative(transcript: &str) -> bool {
    let normalized = transcript.trim().to_ascii_lowercase();
    AFFIRMATIVE_REPLIES.contains(&normalized.as_str())
}

fn elicit_prompt(slot: SlotName) -> String {
    format!("Please provide your {slot}.")
}

fn confirmation_prompt(previous: &UserPreference) -> String {
    format!(
        "Your previous search was for {} {} cuisine. Would you like to use the same search again? (Yes/No)",
        previous.location, previous.cuisine
    )
}

fn close(
    request: &DialogueRequest,
    intent: IntentName,
    slots: Option<Slots>,
    message: &str,
) -> DialogueResponse {
    DialogueResponse {
        dialog_action: DialogAction::Close,
        intent: ResponseIntent {
            name: intent.as_str().to_string(),
            state: Some(IntentState::Fulfilled),
            slots,
        },
        session_attributes: request.session_attributes.clone(),
        session_id: request.session_id.clone(),
        messages: vec![message.to_string()],
    }
}

fn elicit(
    session_id: &str,
    slot: SlotName,
    slots: Slots,
    attributes: SessionAttributes,
    message: &str,
) -> DialogueResponse {
    DialogueResponse {
        dialog_action: DialogAction::ElicitSlot { slot_to_elicit: slot },
        intent: ResponseIntent {
            name: IntentName::DiningSuggestions.as_str().to_string(),
            state: Some(IntentState::InProgress),
            slots: Some(slots),
        },
        session_attributes: attributes,
        session_id: session_id.to_string(),
        messages: vec![message.to_string()],
    }
}
