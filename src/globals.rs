use std::sync::OnceLock;
use std::time::Duration;

/// Timeout applied by the default HTTP client
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Global HTTP client for requests that don't bring their own
static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get a reference to the global HTTP client
/// Lazily initialized on first access
pub fn http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(|| build_http_client(DEFAULT_HTTP_TIMEOUT))
}

/// Build a client with the given timeout, for configurations that override the default
pub fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_singleton() {
        let client1 = http_client();
        let client2 = http_client();
        assert!(std::ptr::eq(client1, client2));
    }
}
