use crate::commands::{with_database, CommandResult};
use concierge_db::repositories::{
    SqlPreferenceRepository, SqlRequestQueue, SqlRestaurantRepository, SqlSearchIndexRepository,
};
use concierge_worker::{DrainReport, FulfillmentWorker, SmtpNotifier};

pub fn run() -> CommandResult {
    let outcome = with_database("work", |config, pool| async move {
        let notifier = SmtpNotifier::from_config(&config.smtp)
            .map_err(|error| ("smtp_setup", error.to_string(), 6u8))?;
        let worker = FulfillmentWorker::new(
            SqlRequestQueue::new(pool.clone(), config.worker.visibility_timeout_secs),
            SqlSearchIndexRepository::new(pool.clone()),
            SqlRestaurantRepository::new(pool.clone()),
            SqlPreferenceRepository::new(pool),
            notifier,
            config.worker.batch_size,
            config.worker.candidate_count,
        );
        worker.drain().await.map_err(|error| ("drain", error.to_string(), 7u8))
    });

    match outcome {
        Ok(report) => CommandResult::success("work", render_report(&report)),
        Err(result) => result,
    }
}

fn render_report(report: &DrainReport) -> String {
    format!(
        "drain complete: received={} fulfilled={} skipped={} abandoned={}",
        report.received, report.fulfilled, report.skipped, report.abandoned
    )
}
