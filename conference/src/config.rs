//! Configuration management for the conference service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Services never read the environment themselves; they receive
//! [`ServiceSettings`] so tests stay independent of the process.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings handed to the services
    pub services: ServiceSettings,
    /// Interval of the announcement refresh loop, in seconds
    pub announcement_refresh_secs: u64,
    /// Log filter (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Tunables consumed by the services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Upper bound of the almost-sold-out window `0 < seats <= threshold`
    pub announcement_seats_threshold: i64,
    /// Latest start time returned by the non-workshop query
    pub non_workshop_cutoff: NaiveTime,
    /// Session type excluded by the non-workshop query
    pub workshop_session_type: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            announcement_seats_threshold: 5,
            non_workshop_cutoff: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            workshop_session_type: "workshop".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = ServiceSettings::default();
        Self {
            services: ServiceSettings {
                announcement_seats_threshold: env::var("ANNOUNCEMENT_SEATS_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.announcement_seats_threshold),
                non_workshop_cutoff: env::var("NON_WORKSHOP_CUTOFF")
                    .ok()
                    .and_then(|s| NaiveTime::parse_from_str(&s, "%H:%M").ok())
                    .unwrap_or(defaults.non_workshop_cutoff),
                workshop_session_type: env::var("WORKSHOP_SESSION_TYPE")
                    .unwrap_or(defaults.workshop_session_type),
            },
            announcement_refresh_secs: env::var("ANNOUNCEMENT_REFRESH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
