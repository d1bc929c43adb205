//! Environment configuration for the relay.

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Shared secret used to verify provider webhook signatures.
    pub webhook_secret: Vec<u8>,
    pub port: u16,
    pub rate_limit_rpm: u64,
    pub allowed_origins: Vec<String>,
    /// Bearer token for the /metrics endpoint (as raw bytes).
    pub metrics_token: Option<Vec<u8>>,
}

impl RelayConfig {
    /// Read configuration from the environment.
    ///
    /// `MERCHANT_SECRET_KEY` is mandatory: without it every callback would
    /// have to be rejected anyway, so the relay fails closed at startup
    /// instead of serving a dead webhook endpoint. There is no toggle to
    /// skip verification.
    pub fn from_env() -> Self {
        let webhook_secret = match std::env::var("MERCHANT_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
        {
            Some(s) => {
                let bytes = s.into_bytes();
                if bytes.len() < 32 {
                    tracing::warn!(
                        "MERCHANT_SECRET_KEY is only {} bytes (minimum 32 recommended) — \
                         use `openssl rand -hex 32` to generate a secure secret",
                        bytes.len()
                    );
                }
                bytes
            }
            None => {
                tracing::error!(
                    "MERCHANT_SECRET_KEY is required. Set it to the shared secret \
                     configured with the payment provider."
                );
                std::process::exit(1);
            }
        };

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let rate_limit_rpm: u64 = std::env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|r| r.parse().ok())
            .unwrap_or(120);

        let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = std::env::var("METRICS_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.into_bytes());

        if metrics_token.is_none() {
            tracing::warn!(
                "METRICS_TOKEN not set — /metrics requires PAYSYNC_PUBLIC_METRICS=true"
            );
        }

        Self {
            webhook_secret,
            port,
            rate_limit_rpm,
            allowed_origins,
            metrics_token,
        }
    }
}
