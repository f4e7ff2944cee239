//! Background processing for the dining concierge: the fulfillment worker
//! that drains the request queue and emails recommendations, the index
//! builder that derives the per-cuisine search index, and the SMTP notifier
//! both report through.

pub mod fulfillment;
pub mod indexer;
pub mod mailer;

pub use fulfillment::{DrainReport, FulfillmentWorker};
pub use indexer::{CuisineIndexReport, IndexBuilder};
pub use mailer::{Notifier, NotifyError, SmtpNotifier};
