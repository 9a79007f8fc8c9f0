//! Router configuration from environment variables.

use std::time::Duration;

use query_orchestrator::ResolvedLevel;

use crate::error::RouterError;

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Base URL of the general (level 0) instance.
    pub general_url: String,
    /// Base URL of the summary (level 1) instance.
    pub summary_url: String,
    /// Base URL of the technical (level 2) instance.
    pub technical_url: String,
    pub health_interval: Duration,
    pub health_timeout: Duration,
    pub forward_timeout: Duration,
    /// Deadline for one downstream `/ingest` call.
    pub ingest_timeout: Duration,
    /// Deadline for one compression call.
    pub compress_timeout: Duration,
    pub level2_to_1_ratio: f64,
    pub level1_to_0_ratio: f64,
    pub summary_max_tokens: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            general_url: "http://localhost:8000".into(),
            summary_url: "http://localhost:8001".into(),
            technical_url: "http://localhost:8002".into(),
            health_interval: Duration::from_secs(15),
            health_timeout: Duration::from_secs(5),
            forward_timeout: Duration::from_secs(120),
            ingest_timeout: Duration::from_secs(600),
            compress_timeout: Duration::from_secs(120),
            level2_to_1_ratio: 0.2,
            level1_to_0_ratio: 0.5,
            summary_max_tokens: 2048,
        }
    }
}

impl RouterConfig {
    /// Reads `LEVEL{0,1,2}_URL`, timing knobs and compression ratios.
    ///
    /// # Errors
    /// [`RouterError::Config`] for ratios outside `(0, 1]` or empty URLs.
    pub fn from_env() -> Result<Self, RouterError> {
        let d = Self::default();
        let cfg = Self {
            general_url: env("LEVEL0_URL", &d.general_url),
            summary_url: env("LEVEL1_URL", &d.summary_url),
            technical_url: env("LEVEL2_URL", &d.technical_url),
            health_interval: secs("HEALTH_INTERVAL_SECS", d.health_interval),
            health_timeout: secs("HEALTH_TIMEOUT_SECS", d.health_timeout),
            forward_timeout: secs("QUERY_FORWARD_TIMEOUT_SECS", d.forward_timeout),
            ingest_timeout: secs("INGEST_FORWARD_TIMEOUT_SECS", d.ingest_timeout),
            compress_timeout: secs("LLM_TIMEOUT_SECS", d.compress_timeout),
            level2_to_1_ratio: parse("LEVEL2_TO_1_RATIO", d.level2_to_1_ratio),
            level1_to_0_ratio: parse("LEVEL1_TO_0_RATIO", d.level1_to_0_ratio),
            summary_max_tokens: parse("SUMMARY_MAX_TOKENS", d.summary_max_tokens),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), RouterError> {
        for (name, r) in [
            ("LEVEL2_TO_1_RATIO", self.level2_to_1_ratio),
            ("LEVEL1_TO_0_RATIO", self.level1_to_0_ratio),
        ] {
            if !(r > 0.0 && r <= 1.0) {
                return Err(RouterError::Config(format!("{name} must be in (0, 1], got {r}")));
            }
        }
        for (level, url) in self.targets() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RouterError::Config(format!(
                    "{level} url must start with http:// or https://, got {url:?}"
                )));
            }
        }
        Ok(())
    }

    /// Downstream base URL for a level, without a trailing slash.
    pub fn url(&self, level: ResolvedLevel) -> &str {
        let raw = match level {
            ResolvedLevel::General => &self.general_url,
            ResolvedLevel::Summary => &self.summary_url,
            ResolvedLevel::Technical => &self.technical_url,
        };
        raw.trim_end_matches('/')
    }

    pub fn targets(&self) -> Vec<(ResolvedLevel, String)> {
        ResolvedLevel::ALL
            .iter()
            .map(|l| (*l, self.url(*l).to_string()))
            .collect()
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k).unwrap_or_else(|_| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}

fn secs(k: &str, dflt: Duration) -> Duration {
    Duration::from_secs(parse(k, dflt.as_secs()).max(1))
}
