use chrono::Utc;
use tracing::{debug, info, warn};

use concierge_core::domain::preference::UserPreference;
use concierge_core::domain::request::PendingRequest;
use concierge_core::domain::restaurant::RestaurantRecord;
use concierge_db::repositories::{
    PreferenceRepository, ReceivedMessage, RepositoryError, RequestQueue, RestaurantRepository,
    SearchIndexRepository,
};

use crate::mailer::{recommendation_body, recommendation_subject, Notifier};

/// Outcome of one queue drain.
///
/// `skipped` counts messages whose payload lacked the fulfillment fields;
/// `abandoned` counts messages left queued for retry (too few candidates,
/// or a dependency failure mid-message).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub received: u32,
    pub fulfilled: u32,
    pub skipped: u32,
    pub abandoned: u32,
}

pub struct FulfillmentWorker<Q, S, R, P, N> {
    queue: Q,
    index: S,
    restaurants: R,
    preferences: P,
    notifier: N,
    batch_size: u32,
    candidate_count: u32,
}

impl<Q, S, R, P, N> FulfillmentWorker<Q, S, R, P, N>
where
    Q: RequestQueue,
    S: SearchIndexRepository,
    R: RestaurantRepository,
    P: PreferenceRepository,
    N: Notifier,
{
    pub fn new(
        queue: Q,
        index: S,
        restaurants: R,
        preferences: P,
        notifier: N,
        batch_size: u32,
        candidate_count: u32,
    ) -> Self {
        Self { queue, index, restaurants, preferences, notifier, batch_size, candidate_count }
    }

    /// One drain: a zero-wait poll followed by per-message processing. A
    /// failure in one message never aborts the rest of the batch.
    pub async fn drain(&self) -> Result<DrainReport, RepositoryError> {
        let messages = self.queue.receive_batch(self.batch_size).await?;
        let mut report = DrainReport { received: messages.len() as u32, ..DrainReport::default() };

        for message in messages {
            match self.fulfill_one(&message).await {
                Ok(MessageOutcome::Fulfilled) => report.fulfilled += 1,
                Ok(MessageOutcome::Skipped) => report.skipped += 1,
                Ok(MessageOutcome::Abandoned) => report.abandoned += 1,
                Err(error) => {
                    warn!(
                        event_name = "worker.message_failed",
                        message_id = %message.message_id,
                        receive_count = message.receive_count,
                        error = %error,
                        "message left queued after processing error"
                    );
                    report.abandoned += 1;
                }
            }
        }

        info!(
            event_name = "worker.drain_complete",
            received = report.received,
            fulfilled = report.fulfilled,
            skipped = report.skipped,
            abandoned = report.abandoned,
            "queue drain finished"
        );

        Ok(report)
    }

    async fn fulfill_one(&self, message: &ReceivedMessage) -> Result<MessageOutcome, WorkerError> {
        let request = match message.parse_request() {
            Ok(request) => request,
            Err(error) => {
                warn!(
                    event_name = "worker.unparseable_message",
                    message_id = %message.message_id,
                    error = %error,
                    "skipping message with unparseable body"
                );
                return Ok(MessageOutcome::Skipped);
            }
        };

        if !request.has_fulfillment_fields() {
            warn!(
                event_name = "worker.incomplete_message",
                message_id = %message.message_id,
                "skipping message without cuisine or contact email"
            );
            return Ok(MessageOutcome::Skipped);
        }

        let wanted = self.candidate_count as usize;
        let business_ids = self.index.find_business_ids(&request.cuisine, self.candidate_count).await?;
        if business_ids.len() < wanted {
            debug!(
                event_name = "worker.too_few_candidates",
                message_id = %message.message_id,
                cuisine = %request.cuisine,
                found = business_ids.len(),
                "abandoning message for retry"
            );
            return Ok(MessageOutcome::Abandoned);
        }

        let mut restaurants = Vec::with_capacity(wanted);
        for business_id in &business_ids {
            if let Some(record) = self.restaurants.find_by_business_id(business_id).await? {
                restaurants.push(record);
            }
        }
        if restaurants.len() < wanted {
            debug!(
                event_name = "worker.unresolved_candidates",
                message_id = %message.message_id,
                cuisine = %request.cuisine,
                resolved = restaurants.len(),
                "abandoning message for retry"
            );
            return Ok(MessageOutcome::Abandoned);
        }

        self.record_history(&request, &restaurants).await?;

        let subject = recommendation_subject(&request.cuisine);
        let body = recommendation_body(&request.cuisine, &restaurants);
        self.notifier.send(&request.email, &subject, &body).await?;

        // Delete only after the send; a stale handle means the visibility
        // timeout lapsed mid-message and another drain may redeliver it.
        if !self.queue.delete(&message.receipt_handle).await? {
            warn!(
                event_name = "worker.stale_receipt",
                message_id = %message.message_id,
                "receipt handle expired before delete; message may be redelivered"
            );
        }

        info!(
            event_name = "worker.message_fulfilled",
            message_id = %message.message_id,
            contact = %request.email,
            cuisine = %request.cuisine,
            "recommendations emailed"
        );

        Ok(MessageOutcome::Fulfilled)
    }

    async fn record_history(
        &self,
        request: &PendingRequest,
        restaurants: &[RestaurantRecord],
    ) -> Result<(), WorkerError> {
        let names = restaurants.iter().map(|record| record.name.clone()).collect();
        let preference = UserPreference {
            email: request.email.clone(),
            location: request.location.clone(),
            cuisine: request.cuisine.clone(),
            dining_time: request.dining_time.clone(),
            number_of_people: request.number_of_people.clone(),
            restaurant_names: Some(names),
            updated_at: Utc::now(),
        };
        self.preferences.save(preference).await?;
        Ok(())
    }
}

enum MessageOutcome {
    Fulfilled,
    Skipped,
    Abandoned,
}

#[derive(Debug, thiserror::Error)]
enum WorkerError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notify(#[from] crate::mailer::NotifyError),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use concierge_core::domain::preference::UserPreference;
    use concierge_core::domain::request::PendingRequest;
    use concierge_core::domain::restaurant::{BusinessId, RestaurantRecord, SearchIndexEntry};
    use concierge_db::repositories::{
        PreferenceRepository, ReceivedMessage, RepositoryError, RequestQueue, RestaurantRepository,
        SearchIndexRepository,
    };

    use crate::mailer::{Notifier, NotifyError};

    use super::{DrainReport, FulfillmentWorker};

    #[derive(Default)]
    struct FakeQueue {
        messages: Mutex<Vec<ReceivedMessage>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeQueue {
        fn with_bodies(bodies: &[&str]) -> Self {
            let messages = bodies
                .iter()
                .enumerate()
                .map(|(index, body)| ReceivedMessage {
                    message_id: format!("msg-{index}"),
                    receipt_handle: format!("receipt-{index}"),
                    body: (*body).to_string(),
                    receive_count: 1,
                })
                .collect();
            Self { messages: Mutex::new(messages), deleted: Mutex::default() }
        }

        fn deleted_receipts(&self) -> Vec<String> {
            self.deleted.lock().expect("lock").clone()
        }
    }

    #[async_trait::async_trait]
    impl RequestQueue for &FakeQueue {
        async fn enqueue(&self, _request: &PendingRequest) -> Result<String, RepositoryError> {
            unimplemented!("drain tests never enqueue")
        }

        async fn receive_batch(
            &self,
            max_messages: u32,
        ) -> Result<Vec<ReceivedMessage>, RepositoryError> {
            let mut messages = self.messages.lock().expect("lock");
            let take = (max_messages as usize).min(messages.len());
            Ok(messages.drain(..take).collect())
        }

        async fn delete(&self, receipt_handle: &str) -> Result<bool, RepositoryError> {
            self.deleted.lock().expect("lock").push(receipt_handle.to_string());
            Ok(true)
        }
    }

    #[derive(Default)]
    struct FakeIndex {
        entries: Vec<SearchIndexEntry>,
    }

    #[async_trait::async_trait]
    impl SearchIndexRepository for &FakeIndex {
        async fn insert(&self, _entry: SearchIndexEntry) -> Result<(), RepositoryError> {
            unimplemented!("drain tests never insert index entries")
        }

        async fn find_business_ids(
            &self,
            cuisine: &str,
            limit: u32,
        ) -> Result<Vec<BusinessId>, RepositoryError> {
            Ok(self
                .entries
                .iter()
                .filter(|entry| entry.cuisine == cuisine)
                .take(limit as usize)
                .map(|entry| entry.business_id.clone())
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeRestaurants {
        records: HashMap<String, RestaurantRecord>,
    }

    #[async_trait::async_trait]
    impl RestaurantRepository for &FakeRestaurants {
        async fn find_by_business_id(
            &self,
            business_id: &BusinessId,
        ) -> Result<Option<RestaurantRecord>, RepositoryError> {
            Ok(self.records.get(&business_id.0).cloned())
        }

        async fn scan_by_cuisine(
            &self,
            _cuisine: &str,
            _locality: &str,
            _offset: u32,
            _page_size: u32,
        ) -> Result<Vec<RestaurantRecord>, RepositoryError> {
            unimplemented!("drain tests never scan")
        }

        async fn save(&self, _record: RestaurantRecord) -> Result<(), RepositoryError> {
            unimplemented!("drain tests never save restaurants")
        }
    }

    #[derive(Default)]
    struct FakePreferences {
        saved: Mutex<Vec<UserPreference>>,
    }

    #[async_trait::async_trait]
    impl PreferenceRepository for &FakePreferences {
        async fn find_by_email(
            &self,
            _email: &str,
        ) -> Result<Option<UserPreference>, RepositoryError> {
            Ok(None)
        }

        async fn save(&self, preference: UserPreference) -> Result<(), RepositoryError> {
            self.saved.lock().expect("lock").push(preference);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for &FakeNotifier {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Address("no-at-sign".parse::<lettre::Address>().unwrap_err()));
            }
            self.sent
                .lock()
                .expect("lock")
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn restaurant(id: &str, name: &str, cuisine: &str) -> RestaurantRecord {
        RestaurantRecord {
            business_id: BusinessId(id.to_string()),
            name: name.to_string(),
            address: format!("{name} street"),
            cuisine: cuisine.to_string(),
            rating: Some(4.0),
            review_count: Some(10),
            zip_code: None,
            inserted_at: Utc::now(),
        }
    }

    fn indexed_restaurants(cuisine: &str, count: usize) -> (FakeIndex, FakeRestaurants) {
        let mut index = FakeIndex::default();
        let mut restaurants = FakeRestaurants::default();
        for number in 0..count {
            let id = format!("biz-{number}");
            index.entries.push(SearchIndexEntry {
                business_id: BusinessId(id.clone()),
                cuisine: cuisine.to_string(),
            });
            restaurants
                .records
                .insert(id.clone(), restaurant(&id, &format!("Place {number}"), cuisine));
        }
        (index, restaurants)
    }

    fn valid_body() -> String {
        let request = PendingRequest::new("Manhattan", "Italian", "19:00", "2", "diner@example.com");
        serde_json::to_string(&request).expect("serialize request")
    }

    fn worker<'a>(
        queue: &'a FakeQueue,
        index: &'a FakeIndex,
        restaurants: &'a FakeRestaurants,
        preferences: &'a FakePreferences,
        notifier: &'a FakeNotifier,
    ) -> FulfillmentWorker<&'a FakeQueue, &'a FakeIndex, &'a FakeRestaurants, &'a FakePreferences, &'a FakeNotifier>
    {
        FulfillmentWorker::new(queue, index, restaurants, preferences, notifier, 10, 3)
    }

    #[tokio::test]
    async fn empty_queue_drain_reports_nothing() {
        let queue = FakeQueue::default();
        let (index, restaurants) = indexed_restaurants("Italian", 3);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport::default());
    }

    #[tokio::test]
    async fn fulfilled_message_emails_records_history_and_deletes() {
        let queue = FakeQueue::with_bodies(&[&valid_body()]);
        let (index, restaurants) = indexed_restaurants("Italian", 3);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 1, fulfilled: 1, skipped: 0, abandoned: 0 });

        let sent = notifier.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        let (to, subject, body) = &sent[0];
        assert_eq!(to, "diner@example.com");
        assert_eq!(subject, "Your recommendations for Italian cuisine are here");
        assert!(body.starts_with("Hello! Here are my Italian restaurant suggestions:"));
        assert!(body.contains("1. Place 0, located at Place 0 street"));
        assert!(body.ends_with("Enjoy your meal!"));

        let saved = preferences.saved.lock().expect("lock").clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(
            saved[0].restaurant_names,
            Some(vec!["Place 0".to_string(), "Place 1".to_string(), "Place 2".to_string()])
        );

        assert_eq!(queue.deleted_receipts(), vec!["receipt-0".to_string()]);
    }

    #[tokio::test]
    async fn message_without_contact_email_is_skipped_but_not_deleted() {
        let body = r#"{"cuisine": "Italian"}"#;
        let queue = FakeQueue::with_bodies(&[body]);
        let (index, restaurants) = indexed_restaurants("Italian", 3);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 1, fulfilled: 0, skipped: 1, abandoned: 0 });
        assert!(queue.deleted_receipts().is_empty());
        assert!(notifier.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn too_few_candidates_abandons_the_message_for_retry() {
        let queue = FakeQueue::with_bodies(&[&valid_body()]);
        let (index, restaurants) = indexed_restaurants("Italian", 2);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 1, fulfilled: 0, skipped: 0, abandoned: 1 });
        assert!(queue.deleted_receipts().is_empty());
        assert!(preferences.saved.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unresolvable_candidate_records_abandon_the_message() {
        let queue = FakeQueue::with_bodies(&[&valid_body()]);
        let (index, mut restaurants) = indexed_restaurants("Italian", 3);
        restaurants.records.remove("biz-1");
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 1, fulfilled: 0, skipped: 0, abandoned: 1 });
        assert!(queue.deleted_receipts().is_empty());
    }

    #[tokio::test]
    async fn failed_send_leaves_the_message_queued() {
        let queue = FakeQueue::with_bodies(&[&valid_body()]);
        let (index, restaurants) = indexed_restaurants("Italian", 3);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier { fail: true, ..FakeNotifier::default() };

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 1, fulfilled: 0, skipped: 0, abandoned: 1 });
        assert!(queue.deleted_receipts().is_empty());
    }

    #[tokio::test]
    async fn one_bad_message_never_aborts_the_batch() {
        let queue = FakeQueue::with_bodies(&["not json at all", &valid_body()]);
        let (index, restaurants) = indexed_restaurants("Italian", 3);
        let preferences = FakePreferences::default();
        let notifier = FakeNotifier::default();

        let report = worker(&queue, &index, &restaurants, &preferences, &notifier)
            .drain()
            .await
            .expect("drain");

        assert_eq!(report, DrainReport { received: 2, fulfilled: 1, skipped: 1, abandoned: 0 });
        assert_eq!(queue.deleted_receipts(), vec!["receipt-1".to_string()]);
    }
}
