//! Reward animations used as immediate reinforcement.
//!
//! Each [`RewardAsset`] is fetched once at startup. A failed fetch only makes
//! that animation unavailable; playback of an unavailable asset renders nothing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::activity_log;

/// JSON animation descriptor as served by the asset host
pub type AnimationData = serde_json::Value;

/// Named reinforcement animations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardAsset {
    Success,
    Calm,
    Welcome,
}

impl RewardAsset {
    pub const ALL: [RewardAsset; 3] = [RewardAsset::Success, RewardAsset::Calm, RewardAsset::Welcome];

    pub fn id(&self) -> &'static str {
        match self {
            RewardAsset::Success => "success",
            RewardAsset::Calm => "calm",
            RewardAsset::Welcome => "welcome",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|asset| asset.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Caption of the control that plays this animation
    pub fn caption(&self) -> &'static str {
        match self {
            RewardAsset::Success => "Play: Great Job!",
            RewardAsset::Calm => "Play: Deep Breaths",
            RewardAsset::Welcome => "Play: Welcome/Focus",
        }
    }
}

impl fmt::Display for RewardAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Source URL for each reward animation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardUrls {
    pub success: String,
    pub calm: String,
    pub welcome: String,
}

impl Default for RewardUrls {
    fn default() -> Self {
        Self {
            success: "https://assets10.lottiefiles.com/packages/lf20_5upj49.json".to_string(),
            calm: "https://assets3.lottiefiles.com/packages/lf20_sk5h1kfn.json".to_string(),
            welcome: "https://assets5.lottiefiles.com/packages/lf20_V9t630.json".to_string(),
        }
    }
}

impl RewardUrls {
    pub fn url_for(&self, asset: RewardAsset) -> &str {
        match asset {
            RewardAsset::Success => &self.success,
            RewardAsset::Calm => &self.calm,
            RewardAsset::Welcome => &self.welcome,
        }
    }
}

/// Why an animation could not be fetched
#[derive(Debug, Error)]
pub enum AssetFetchError {
    #[error("Asset host returned HTTP {0}")]
    Status(u16),

    #[error("Asset request failed: {0}")]
    Transport(String),

    #[error("Invalid animation JSON: {0}")]
    InvalidJson(String),
}

/// Raw HTTP response from an [`AnimationFetcher`]
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs the GET for an animation URL
pub trait AnimationFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, AssetFetchError>;
}

/// Blocking HTTP fetcher used at startup
pub struct HttpAnimationFetcher {
    client: reqwest::blocking::Client,
}

impl HttpAnimationFetcher {
    /// `timeout: None` waits indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self, AssetFetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssetFetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl AnimationFetcher for HttpAnimationFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, AssetFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AssetFetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| AssetFetchError::Transport(e.to_string()))?
            .to_vec();
        Ok(FetchResponse { status, body })
    }
}

/// Fetch and parse a single animation descriptor
pub fn fetch_animation(
    fetcher: &dyn AnimationFetcher,
    url: &str,
) -> Result<AnimationData, AssetFetchError> {
    let response = fetcher.get(url)?;
    if !(200..300).contains(&response.status) {
        return Err(AssetFetchError::Status(response.status));
    }
    serde_json::from_slice(&response.body).map_err(|e| AssetFetchError::InvalidJson(e.to_string()))
}

/// Availability of one reward control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSummary {
    pub asset: RewardAsset,
    pub caption: String,
    pub available: bool,
}

/// Animation selected by a reward control; `None` renders nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPlayback {
    pub asset: RewardAsset,
    pub animation: Option<AnimationData>,
}

/// Animations fetched at startup
#[derive(Debug, Clone, Default)]
pub struct RewardLibrary {
    animations: HashMap<RewardAsset, AnimationData>,
}

impl RewardLibrary {
    /// Library with no animations available
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fetch every asset once. Failures are logged and leave the asset absent.
    pub fn load(fetcher: &dyn AnimationFetcher, urls: &RewardUrls) -> Self {
        let mut animations = HashMap::new();
        for asset in RewardAsset::ALL {
            let url = urls.url_for(asset);
            debug!("Fetching reward animation {} from {}", asset, url);
            match fetch_animation(fetcher, url) {
                Ok(data) => {
                    activity_log::log_asset_fetch(asset.id(), true, None);
                    animations.insert(asset, data);
                }
                Err(e) => {
                    activity_log::log_asset_fetch(asset.id(), false, Some(&e.to_string()));
                }
            }
        }
        Self { animations }
    }

    pub fn with_animation(mut self, asset: RewardAsset, data: AnimationData) -> Self {
        self.animations.insert(asset, data);
        self
    }

    pub fn resolve(&self, asset: RewardAsset) -> Option<&AnimationData> {
        self.animations.get(&asset)
    }

    pub fn is_available(&self, asset: RewardAsset) -> bool {
        self.animations.contains_key(&asset)
    }

    /// Pure selection of the pre-fetched payload
    pub fn play(&self, asset: RewardAsset) -> RewardPlayback {
        RewardPlayback {
            asset,
            animation: self.resolve(asset).cloned(),
        }
    }

    pub fn summaries(&self) -> Vec<RewardSummary> {
        RewardAsset::ALL
            .into_iter()
            .map(|asset| RewardSummary {
                asset,
                caption: asset.caption().to_string(),
                available: self.is_available(asset),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves canned responses keyed by URL and records requests
    struct StubFetcher {
        responses: HashMap<String, Result<FetchResponse, String>>,
        requests: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
            );
            self
        }

        fn fail(mut self, url: &str, message: &str) -> Self {
            self.responses
                .insert(url.to_string(), Err(message.to_string()));
            self
        }
    }

    impl AnimationFetcher for StubFetcher {
        fn get(&self, url: &str) -> Result<FetchResponse, AssetFetchError> {
            self.requests.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(AssetFetchError::Transport(message.clone())),
                None => Err(AssetFetchError::Transport("no route".to_string())),
            }
        }
    }

    fn urls() -> RewardUrls {
        RewardUrls {
            success: "http://assets/success.json".to_string(),
            calm: "http://assets/calm.json".to_string(),
            welcome: "http://assets/welcome.json".to_string(),
        }
    }

    #[test]
    fn test_resolve_404_is_absent() {
        let fetcher = StubFetcher::new().respond("http://assets/success.json", 404, "not found");
        let library = RewardLibrary::load(&fetcher, &urls());
        assert!(library.resolve(RewardAsset::Success).is_none());
    }

    #[test]
    fn test_resolve_200_returns_payload() {
        let payload = r#"{"v":"5.5.7","fr":30,"layers":[]}"#;
        let fetcher = StubFetcher::new().respond("http://assets/calm.json", 200, payload);
        let library = RewardLibrary::load(&fetcher, &urls());

        let expected: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(library.resolve(RewardAsset::Calm), Some(&expected));
    }

    #[test]
    fn test_invalid_json_is_absent() {
        let fetcher = StubFetcher::new().respond("http://assets/welcome.json", 200, "<html>");
        let library = RewardLibrary::load(&fetcher, &urls());
        assert!(!library.is_available(RewardAsset::Welcome));
    }

    #[test]
    fn test_transport_failure_is_absent() {
        let fetcher = StubFetcher::new()
            .fail("http://assets/success.json", "dns error")
            .respond("http://assets/calm.json", 200, "{}");
        let library = RewardLibrary::load(&fetcher, &urls());

        assert!(!library.is_available(RewardAsset::Success));
        assert!(library.is_available(RewardAsset::Calm));
    }

    #[test]
    fn test_each_asset_fetched_once() {
        let fetcher = StubFetcher::new();
        let _ = RewardLibrary::load(&fetcher, &urls());
        assert_eq!(fetcher.requests.borrow().len(), 3);
    }

    #[test]
    fn test_fetch_animation_status_error() {
        let fetcher = StubFetcher::new().respond("http://x", 503, "");
        let err = fetch_animation(&fetcher, "http://x").unwrap_err();
        assert!(matches!(err, AssetFetchError::Status(503)));
    }

    #[test]
    fn test_play_absent_renders_nothing() {
        let playback = RewardLibrary::empty().play(RewardAsset::Welcome);
        assert!(playback.animation.is_none());

        let json = serde_json::to_value(&playback).unwrap();
        assert_eq!(json["asset"], "welcome");
        assert!(json["animation"].is_null());
    }

    #[test]
    fn test_play_present() {
        let library =
            RewardLibrary::empty().with_animation(RewardAsset::Success, serde_json::json!({"fr": 60}));
        let playback = library.play(RewardAsset::Success);
        assert_eq!(playback.animation.unwrap()["fr"], 60);
    }

    #[test]
    fn test_summaries() {
        let library = RewardLibrary::empty().with_animation(RewardAsset::Calm, serde_json::json!({}));
        let summaries = library.summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].caption, "Play: Great Job!");
        assert!(!summaries[0].available);
        assert!(summaries[1].available);
    }

    #[test]
    fn test_asset_ids() {
        assert_eq!(RewardAsset::from_id("Calm"), Some(RewardAsset::Calm));
        assert_eq!(RewardAsset::from_id("confetti"), None);
        for asset in RewardAsset::ALL {
            assert_eq!(RewardAsset::from_id(asset.id()), Some(asset));
        }
    }

    #[test]
    fn test_default_urls_are_distinct() {
        let urls = RewardUrls::default();
        assert_ne!(urls.success, urls.calm);
        assert_ne!(urls.calm, urls.welcome);
        assert!(urls.url_for(RewardAsset::Welcome).ends_with(".json"));
    }
}
