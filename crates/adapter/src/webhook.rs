use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::{AuditEvent, CommunityId, MirrorRef, Suggestion, VoteTally};
use engine::{AuditLogger, MirrorPublisher, ReactionSurface};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Root of the chat bridge API, without a trailing slash.
    pub base_url: String,
    /// Public link to a mirrored message, with `{community}` and `{message}` placeholders.
    #[serde(default)]
    pub link_template: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Serialize)]
struct MirrorBody<'a> {
    suggestion: &'a Suggestion,
    /// e.g. `ALREADY PLANNED`
    status_label: String,
    score: i64,
    thread_id: u64,
}

impl<'a> MirrorBody<'a> {
    fn new(suggestion: &'a Suggestion, thread_id: u64) -> Self {
        Self {
            suggestion,
            status_label: suggestion.status.to_string(),
            score: suggestion.score(),
            thread_id,
        }
    }
}

/// Chat bridge reached over HTTP. Mirrors suggestions as messages, reads
/// their reactions back and forwards audit records.
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("suggestions/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building webhook HTTP client")?;
        Ok(Self { http, config })
    }

    fn url(&self, community: CommunityId, path: &str) -> String {
        format!(
            "{}/communities/{}{}",
            self.config.base_url.trim_end_matches('/'),
            community,
            path
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl MirrorPublisher for WebhookClient {
    async fn publish(&self, suggestion: &Suggestion) -> Result<MirrorRef> {
        let url = self.url(suggestion.community_id, "/messages");
        let mirror: MirrorRef = self
            .request(reqwest::Method::POST, url)
            .json(&MirrorBody::new(suggestion, 0))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding published message reference")?;
        if !mirror.is_published() {
            anyhow::bail!("bridge returned an empty message id");
        }
        debug!(id = suggestion.id, message = mirror.message_id, "Published suggestion");
        Ok(mirror)
    }

    async fn update(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<MirrorRef> {
        let url = self.url(
            suggestion.community_id,
            &format!("/messages/{}", mirror.message_id),
        );
        let next: MirrorRef = self
            .request(reqwest::Method::PUT, url)
            .json(&MirrorBody::new(suggestion, mirror.thread_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("decoding updated message reference")?;
        // the message id never moves; only the thread can be closed
        Ok(MirrorRef {
            message_id: mirror.message_id,
            thread_id: next.thread_id,
        })
    }

    async fn teardown(&self, suggestion: &Suggestion, mirror: MirrorRef) -> Result<()> {
        let url = self.url(
            suggestion.community_id,
            &format!("/messages/{}?thread_id={}", mirror.message_id, mirror.thread_id),
        );
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id = suggestion.id, "Mirror already gone");
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }

    fn link(&self, community: CommunityId, mirror: MirrorRef) -> Option<String> {
        let template = self.config.link_template.as_ref()?;
        Some(
            template
                .replace("{community}", &community.to_string())
                .replace("{message}", &mirror.message_id.to_string()),
        )
    }
}

#[async_trait]
impl ReactionSurface for WebhookClient {
    async fn reaction_counts(
        &self,
        suggestion: &Suggestion,
        mirror: MirrorRef,
    ) -> Result<Option<VoteTally>> {
        let url = self.url(
            suggestion.community_id,
            &format!("/messages/{}/reactions", mirror.message_id),
        );
        let response = self.request(reqwest::Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let tally = response
            .error_for_status()?
            .json::<VoteTally>()
            .await
            .context("decoding reaction counts")?;
        Ok(Some(tally))
    }
}

#[async_trait]
impl AuditLogger for WebhookClient {
    async fn record(&self, community: CommunityId, event: &AuditEvent) -> Result<()> {
        self.request(reqwest::Method::POST, self.url(community, "/audit"))
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
