use crate::commands::{with_database, CommandResult};
use concierge_db::migrations::{self, MIGRATOR};

pub fn run() -> CommandResult {
    let outcome = with_database("migrate", |_config, pool| async move {
        // `with_database` already applied everything; report what remains so
        // a partial failure is visible in the payload.
        let remaining = migrations::pending_versions(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        Ok(remaining)
    });

    match outcome {
        Ok(remaining) if remaining.is_empty() => {
            let known = MIGRATOR.iter().filter(|m| m.migration_type.is_up_migration()).count();
            CommandResult::success(
                "migrate",
                format!("database schema is current ({known} migrations applied)"),
            )
        }
        Ok(remaining) => CommandResult::failure(
            "migrate",
            "migration",
            format!("{} migrations still pending after apply", remaining.len()),
            5,
        ),
        Err(result) => result,
    }
}
