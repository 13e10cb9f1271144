use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP client internals that flood `debug` during feed and checklist fetches
const QUIET_TARGETS: &[&str] = &["hyper_util", "reqwest", "h2", "rustls"];

/// Filter directives for `log_level` with the quiet targets capped at `warn`
fn default_directives(log_level: &str) -> String {
    let mut directives = vec![log_level.trim().to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
    directives.join(",")
}

/// Initialize tracing subscriber with the specified format and level.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init(log_format: &str, log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .flatten_event(true)
                        .with_current_span(false)
                        .with_target(true),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives(" debug "),
            "debug,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn"
        );
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
