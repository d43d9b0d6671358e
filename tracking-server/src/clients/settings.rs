//! Settings service client - SLA configuration fetch
//!
//! SLA settings are process-wide, loaded once per refresh interval.
//! Changes take effect on the next fetch; there is no hot-reload
//! guarantee, and any fetch failure falls back to the last good value
//! (or the configured defaults).

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use shared::models::SlaSettings;

struct CachedSettings {
    settings: SlaSettings,
    fetched_at: Option<Instant>,
}

pub struct SettingsClient {
    http: reqwest::Client,
    /// Settings service endpoint; `None` means defaults only.
    url: Option<String>,
    refresh_interval: Duration,
    cached: RwLock<CachedSettings>,
}

impl SettingsClient {
    pub fn new(url: Option<String>, defaults: SlaSettings, refresh_interval: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            refresh_interval,
            cached: RwLock::new(CachedSettings {
                settings: defaults,
                fetched_at: None,
            }),
        }
    }

    /// Current SLA settings, refreshed at most once per interval.
    pub async fn current(&self) -> SlaSettings {
        {
            let cached = self.cached.read();
            let fresh = cached
                .fetched_at
                .is_some_and(|at| at.elapsed() < self.refresh_interval);
            if fresh || self.url.is_none() {
                return cached.settings;
            }
        }

        let settings = match self.fetch().await {
            Ok(fetched) => {
                tracing::debug!(target_minutes = fetched.target_minutes, "SLA settings refreshed");
                fetched
            }
            Err(e) => {
                let last_good = self.cached.read().settings;
                tracing::warn!("SLA settings fetch failed, keeping last value: {e}");
                last_good
            }
        };

        let mut cached = self.cached.write();
        cached.settings = settings;
        cached.fetched_at = Some(Instant::now());
        settings
    }

    async fn fetch(&self) -> Result<SlaSettings, reqwest::Error> {
        // `current()` only calls this with a configured URL.
        let url = self.url.as_deref().unwrap_or_default();
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<SlaSettings>()
            .await
    }
}
