pub mod config;
pub mod domain;

pub use domain::dialogue::{
    ConfirmationState, DialogAction, DialogueRequest, DialogueResponse, IntentName, IntentState,
    ResponseIntent, SessionAttributes, SlotName, Slots, REQUIRED_SLOTS,
};
pub use domain::preference::UserPreference;
pub use domain::request::{PendingRequest, RequestValidationError, PENDING_REQUEST_SCHEMA_VERSION};
pub use domain::restaurant::{BusinessId, RestaurantRecord, SearchIndexEntry};
