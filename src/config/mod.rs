use std::env;
use std::time::Duration;

/// Overall deadline for one outbound fetch (connect + transfer).
pub const FETCH_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Ceiling for a fetched HTML page (5 MiB).
pub const MAX_HTML_BYTES: usize = 5 * 1024 * 1024;

/// Ceiling for a fetched image (50 MiB).
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// Identifying `User-Agent` sent with every outbound request.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; OGGrabber/1.0)";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub is_dev: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            is_dev: env::var("APP_ENV").as_deref() != Ok("production"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Time and size limits applied by the bounded fetcher.
///
/// Fixed at build time; `DEFAULT` is what the server runs with. Tests build
/// tighter limits directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_html_bytes: usize,
    pub max_image_bytes: usize,
}

impl FetchLimits {
    pub const DEFAULT: FetchLimits = FetchLimits {
        timeout: FETCH_TIMEOUT,
        max_html_bytes: MAX_HTML_BYTES,
        max_image_bytes: MAX_IMAGE_BYTES,
    };
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}
