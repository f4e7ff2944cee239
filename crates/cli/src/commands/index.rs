use crate::commands::{with_database, CommandResult};
use concierge_db::repositories::{SqlRestaurantRepository, SqlSearchIndexRepository};
use concierge_worker::IndexBuilder;

pub fn run() -> CommandResult {
    let outcome = with_database("index", |config, pool| async move {
        let builder = IndexBuilder::new(
            SqlRestaurantRepository::new(pool.clone()),
            SqlSearchIndexRepository::new(pool),
            &config.indexer,
        );
        builder.build().await.map_err(|error| ("index_build", error.to_string(), 6u8))
    });

    match outcome {
        Ok(reports) => {
            let summary = reports
                .iter()
                .map(|report| format!("{}={}", report.cuisine, report.indexed))
                .collect::<Vec<_>>()
                .join(", ");
            CommandResult::success("index", format!("search index rebuilt: {summary}"))
        }
        Err(result) => result,
    }
}
