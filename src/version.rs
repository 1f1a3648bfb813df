//! Release update checks against the project's GitHub releases feed.

use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GITHUB_RELEASES_URL: &str =
    "https://api.github.com/repos/zmime/zmime-cms/releases/latest";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    body: Option<String>,
    html_url: Option<String>,
    published_at: Option<String>,
}

/// Result of an update check. Failures are folded into `error` so the
/// dashboard can always render something.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateCheck {
    pub has_update: bool,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateCheck {
    fn failed(message: String) -> Self {
        Self {
            has_update: false,
            current_version: CURRENT_VERSION.to_string(),
            latest_version: None,
            release_notes: None,
            download_url: None,
            published_at: None,
            error: Some(message),
        }
    }
}

pub async fn check_for_updates(http: &reqwest::Client, releases_url: &str) -> UpdateCheck {
    let release: Release = match async {
        http.get(releases_url)
            .header("User-Agent", "zmime-cms")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
    .await
    {
        Ok(release) => release,
        Err(err) => {
            log::error!("Failed to check for updates: {err}");
            return UpdateCheck::failed(err.to_string());
        }
    };

    let latest = release.tag_name.trim_start_matches('v').to_string();
    UpdateCheck {
        has_update: is_newer_version(&latest, CURRENT_VERSION),
        current_version: CURRENT_VERSION.to_string(),
        latest_version: Some(latest),
        release_notes: release.body,
        download_url: release.html_url,
        published_at: release.published_at,
        error: None,
    }
}

/// Dotted-numeric comparison; missing components count as zero.
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    let latest_parts = parse(latest);
    let current_parts = parse(current);

    for i in 0..latest_parts.len().max(current_parts.len()) {
        let l = latest_parts.get(i).copied().unwrap_or(0);
        let c = current_parts.get(i).copied().unwrap_or(0);
        if l > c {
            return true;
        }
        if l < c {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn version_comparison() {
        assert!(is_newer_version("1.2.1", "1.2.0"));
        assert!(is_newer_version("2.0", "1.9.9"));
        assert!(is_newer_version("1.2.0.1", "1.2.0"));
        assert!(!is_newer_version("1.2.0", "1.2.0"));
        assert!(!is_newer_version("1.1.9", "1.2.0"));
        assert!(!is_newer_version("1.2", "1.2.0"));
    }

    #[tokio::test]
    async fn detects_a_newer_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "v99.0.0",
                "body": "Big release",
                "html_url": "https://example.com/release",
                "published_at": "2025-06-01T00:00:00Z",
            })))
            .mount(&server)
            .await;

        let check = check_for_updates(
            &reqwest::Client::new(),
            &format!("{}/releases/latest", server.uri()),
        )
        .await;
        assert!(check.has_update);
        assert_eq!(check.latest_version.as_deref(), Some("99.0.0"));
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn network_failure_is_reported_not_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases/latest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let check = check_for_updates(
            &reqwest::Client::new(),
            &format!("{}/releases/latest", server.uri()),
        )
        .await;
        assert!(!check.has_update);
        assert!(check.error.is_some());
        assert_eq!(check.current_version, CURRENT_VERSION);
    }
}
