use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

/// Creates the HTTP client used against the market-data provider: exponential
/// backoff with up to 3 retries, 30s request / 10s connect timeouts.
pub fn create_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// Builds a URL with query parameters. reqwest-middleware 0.5 doesn't expose
/// `.query()`, so the query string is assembled manually.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");

    if base_url.contains('?') {
        format!("{}&{}", base_url, query_string)
    } else {
        format!("{}?{}", base_url, query_string)
    }
}

fn percent_encode(s: &str) -> String {
    let mut encoded = String::new();
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                encoded.push(c);
            }
            _ => {
                for byte in c.to_string().as_bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parameters_are_appended() {
        let url = build_url_with_query(
            "https://example.com/chart",
            &[("interval", "1d"), ("period1", "1640995200")],
        );
        assert_eq!(url, "https://example.com/chart?interval=1d&period1=1640995200");
    }

    #[test]
    fn test_existing_query_string_is_extended() {
        let url = build_url_with_query("https://example.com/x?a=1", &[("b", "2")]);
        assert_eq!(url, "https://example.com/x?a=1&b=2");
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let url = build_url_with_query("https://example.com", &[("symbol", "^NSEI US")]);
        assert_eq!(url, "https://example.com?symbol=%5ENSEI%20US");
    }
}
