//! Conversational layer of the dining concierge.
//!
//! Two halves live here. The `recognizer` module is the client for the
//! external conversational-intent recognizer, which owns natural-language
//! understanding; this crate only ships utterances to it and reads
//! structured replies back. The `fulfiller` module is the dialogue state
//! machine invoked once the recognizer has classified an intent. It decides
//! whether to reuse a stored search, elicits missing slots one at a time,
//! and on completion persists the preference and enqueues the pending
//! request.
//!
//! Every invocation is stateless; cross-turn state (slot values and the
//! confirmation sub-state) rides in the request and response envelopes.

pub mod fulfiller;
pub mod recognizer;

pub use fulfiller::{DialogueError, DialogueFulfiller};
pub use recognizer::{HttpRecognizer, RecognizeText, RecognizedReply, RecognizerError};
