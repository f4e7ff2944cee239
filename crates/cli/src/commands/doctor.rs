use serde::Serialize;

use concierge_core::config::{AppConfig, LoadOptions, SmtpConfig};
use concierge_db::{connect_from_config, migrations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let mut checks = vec![
                DoctorCheck::pass("config_validation", "configuration loaded and validated"),
                endpoint_check("recognizer_endpoint", "recognizer", &config.recognizer.base_url),
                endpoint_check("identity_endpoint", "identity provider", &config.identity.base_url),
                check_smtp_readiness(&config.smtp),
            ];
            checks.extend(database_checks(&config));
            checks
        }
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("recognizer_endpoint"),
            DoctorCheck::skipped("identity_endpoint"),
            DoctorCheck::skipped("smtp_readiness"),
            DoctorCheck::skipped("database_connectivity"),
            DoctorCheck::skipped("schema_status"),
        ],
    };

    let failed = checks.iter().filter(|check| check.status != CheckStatus::Pass).count();
    let (overall_status, summary) = if failed == 0 {
        (CheckStatus::Pass, format!("doctor: all {} readiness checks passed", checks.len()))
    } else {
        (CheckStatus::Fail, format!("doctor: {failed} of {} readiness checks failed", checks.len()))
    };

    DoctorReport { overall_status, summary, checks }
}

fn endpoint_check(name: &'static str, label: &str, base_url: &str) -> DoctorCheck {
    let trimmed = base_url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        DoctorCheck::pass(name, format!("{label} endpoint configured at `{trimmed}`"))
    } else {
        DoctorCheck::fail(name, format!("{label} endpoint `{trimmed}` is not an http(s) URL"))
    }
}

fn check_smtp_readiness(smtp: &SmtpConfig) -> DoctorCheck {
    if !smtp.sender.contains('@') {
        return DoctorCheck::fail(
            "smtp_readiness",
            format!("sender `{}` is not an email address", smtp.sender),
        );
    }
    if smtp.username.is_some() != smtp.password.is_some() {
        return DoctorCheck::fail(
            "smtp_readiness",
            "smtp username and password must be configured together",
        );
    }

    let auth = if smtp.username.is_some() { "authenticated" } else { "unauthenticated" };
    DoctorCheck::pass(
        "smtp_readiness",
        format!("{auth} relay `{}` will send as `{}`", smtp.relay, smtp.sender),
    )
}

fn database_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            )];
        }
    };

    runtime.block_on(async {
        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to `{}`: {error}", config.database.url),
                )];
            }
        };

        let connectivity = DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        );

        let schema = match migrations::pending_versions(&pool).await {
            Ok(pending) if pending.is_empty() => {
                DoctorCheck::pass("schema_status", "schema is current")
            }
            Ok(pending) => DoctorCheck::fail(
                "schema_status",
                format!("{} migrations pending; run `concierge migrate`", pending.len()),
            ),
            Err(error) => {
                DoctorCheck::fail("schema_status", format!("failed to inspect schema: {error}"))
            }
        };

        pool.close().await;
        vec![connectivity, schema]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{
        check_smtp_readiness, endpoint_check, render_human, CheckStatus, DoctorCheck, DoctorReport,
    };
    use concierge_core::config::SmtpConfig;

    #[test]
    fn endpoint_check_requires_an_http_url() {
        let pass = endpoint_check("recognizer_endpoint", "recognizer", "https://nlu.example.com");
        assert_eq!(pass.status, CheckStatus::Pass);

        let fail = endpoint_check("recognizer_endpoint", "recognizer", "nlu.example.com");
        assert_eq!(fail.status, CheckStatus::Fail);
        assert!(fail.details.contains("not an http(s) URL"));
    }

    #[test]
    fn smtp_check_flags_unpaired_credentials() {
        let smtp = SmtpConfig {
            relay: "smtp.example.com".to_string(),
            sender: "concierge@example.com".to_string(),
            username: Some("mailer".to_string()),
            password: None,
        };

        let check = check_smtp_readiness(&smtp);
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.contains("configured together"));
    }

    #[test]
    fn smtp_check_rejects_a_sender_without_an_address() {
        let smtp = SmtpConfig {
            relay: "smtp.example.com".to_string(),
            sender: "not-an-address".to_string(),
            username: None,
            password: None,
        };

        let check = check_smtp_readiness(&smtp);
        assert_eq!(check.status, CheckStatus::Fail);
    }

    #[test]
    fn human_rendering_lists_each_check_with_its_marker() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: 1 of 2 readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck::pass("config_validation", "configuration loaded and validated"),
                DoctorCheck::fail("schema_status", "2 migrations pending"),
            ],
        };

        let rendered = render_human(&report);
        assert!(rendered.starts_with("doctor: 1 of 2 readiness checks failed"));
        assert!(rendered.contains("- [ok] config_validation:"));
        assert!(rendered.contains("- [fail] schema_status: 2 migrations pending"));
    }
}
