use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_IDE_EJE: i64 = 1;
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
/// Largest request body forwarded to the backend.
pub const MAX_PROXY_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Backend base URL without a trailing slash.
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_owned())
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned())
}

/// Entity whose profile the front end shows.
pub fn ide_eje_current() -> i64 {
    std::env::var("PIDE_EJE_CURRENT")
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_IDE_EJE)
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn static_dir() -> String {
    std::env::var("STATIC_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned())
}

pub fn whatsapp_number() -> Option<String> {
    std::env::var("WHATSAPP_NUMBER")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        temp_env::with_vars_unset(
            [
                "API_BASE_URL",
                "PIDE_EJE_CURRENT",
                "SERVER_PORT",
                "STATIC_DIR",
                "WHATSAPP_NUMBER",
                "UPSTREAM_HTTP_TIMEOUT_SECS",
            ],
            || {
                assert_eq!(api_base_url(), DEFAULT_API_BASE_URL);
                assert_eq!(ide_eje_current(), 1);
                assert_eq!(server_port(), 3000);
                assert_eq!(static_dir(), "client/dist");
                assert_eq!(whatsapp_number(), None);
                assert_eq!(upstream_http_timeout(), Duration::from_secs(15));
            },
        );
    }

    #[test]
    fn api_base_url_drops_trailing_slash_and_rejects_non_http() {
        temp_env::with_var("API_BASE_URL", Some("https://siam.example.pe/ "), || {
            assert_eq!(api_base_url(), "https://siam.example.pe");
        });
        temp_env::with_var("API_BASE_URL", Some("siam.example.pe"), || {
            assert_eq!(api_base_url(), DEFAULT_API_BASE_URL);
        });
    }

    #[test]
    fn invalid_numbers_fall_back() {
        temp_env::with_vars(
            [
                ("PIDE_EJE_CURRENT", Some("abc")),
                ("SERVER_PORT", Some("0")),
                ("UPSTREAM_CONNECT_TIMEOUT_SECS", Some("-1")),
            ],
            || {
                assert_eq!(ide_eje_current(), DEFAULT_IDE_EJE);
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(upstream_connect_timeout(), Duration::from_secs(3));
            },
        );
        temp_env::with_var("PIDE_EJE_CURRENT", Some(" 7 "), || {
            assert_eq!(ide_eje_current(), 7);
        });
    }
}
