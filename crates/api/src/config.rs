use bathroom_core::alerts::AlertThresholds;

/// Origin of the bundled backend UI when `BACKEND_URL` is unset.
const DEFAULT_BACKEND_URL: &str = "https://localhost:7131";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins: `CORS_ORIGINS` (comma-separated) plus `BACKEND_URL`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Seconds between two occupancy monitor ticks (default: `30`).
    pub monitor_interval_secs: u64,
    /// Reminder and auto-release marks, in minutes.
    pub alerts: AlertThresholds,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `BACKEND_URL`           | `https://localhost:7131`   |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `MONITOR_INTERVAL_SECS` | `30`                       |
    /// | `FIRST_OCCUPIED_ALERT`  | `10`                       |
    /// | `SECOND_OCCUPIED_ALERT` | `20`                       |
    /// | `THIRD_OCCUPIED_ALERT`  | `25`                       |
    /// | `FREE_OCCUPIED_ALERT`   | `30`                       |
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Panics on malformed server settings. Alert values fall back to their
    /// defaults one by one; if the result is still not strictly increasing
    /// the whole set falls back to the defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());

        let port: u16 = var("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let mut cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backend_url = var("BACKEND_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.into());
        if !cors_origins.contains(&backend_url) {
            cors_origins.push(backend_url);
        }

        let request_timeout_secs: u64 = var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let monitor_interval_secs: u64 = var("MONITOR_INTERVAL_SECS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .expect("MONITOR_INTERVAL_SECS must be a valid u64");
        assert!(
            monitor_interval_secs > 0,
            "MONITOR_INTERVAL_SECS must be positive"
        );

        let alert = |key: &str| {
            let raw = var(key)?;
            match raw.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Ignoring unparsable alert threshold");
                    None
                }
            }
        };
        let alerts = AlertThresholds::from_configured(
            alert("FIRST_OCCUPIED_ALERT"),
            alert("SECOND_OCCUPIED_ALERT"),
            alert("THIRD_OCCUPIED_ALERT"),
            alert("FREE_OCCUPIED_ALERT"),
        )
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Invalid occupancy alerts, using defaults");
            AlertThresholds::default()
        });
        tracing::info!(
            first = alerts.first(),
            second = alerts.second(),
            third = alerts.third(),
            release = alerts.release(),
            "Resolved occupancy alert thresholds"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            monitor_interval_secs,
            alerts,
        }
    }
}
