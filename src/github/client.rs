//! reqwest-based GitHub REST client with pagination, retries and rate limiting.

use super::{CodeSearchItem, ContentResponse, GitHubApi, Tree};
use crate::types::{DepfinderError, HttpConfig, Repository, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const API_VERSION: &str = "2022-11-28";
const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct SearchCodeResponse {
    items: Vec<CodeSearchItem>,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Client for the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    base_url: Url,
    config: HttpConfig,
    rate_limiter: Arc<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
}

impl GitHubClient {
    /// Create a new client authenticated with `token`.
    pub fn new(token: &str, api_url: &str, config: HttpConfig, rate_limit: u32) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            DepfinderError::ConfigError("GitHub token contains invalid characters".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        // Url::join drops the last segment unless the base ends with a slash
        let base_url = if api_url.ends_with('/') {
            Url::parse(api_url)?
        } else {
            Url::parse(&format!("{}/", api_url))?
        };

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            base_url,
            config,
            rate_limiter,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// GET with retries on transient failures.
    async fn get(&self, url: &Url) -> Result<Response> {
        let mut attempt: u32 = 0;

        loop {
            self.rate_limiter.until_ready().await;
            trace!("GET {}", url);

            match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response)
                    if is_retryable(response.status()) && attempt < self.config.max_retries =>
                {
                    debug!("GitHub returned {} for {}, retrying", response.status(), url);
                }
                Ok(response) => return Err(api_error(response).await),
                Err(e)
                    if (e.is_timeout() || e.is_connect()) && attempt < self.config.max_retries =>
                {
                    debug!("Request to {} failed ({}), retrying", url, e);
                }
                Err(e) => return Err(e.into()),
            }

            attempt += 1;
            tokio::time::sleep(backoff(attempt)).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        Ok(self.get(url).await?.json::<T>().await?)
    }

    /// Follow `rel="next"` links and collect the items of every page.
    async fn paginate<T, I, F>(&self, first: Url, extract: F) -> Result<Vec<I>>
    where
        T: DeserializeOwned,
        F: Fn(T) -> Vec<I>,
    {
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next {
            let response = self.get(&url).await?;
            next = match response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_link)
            {
                Some(link) => Some(Url::parse(&link)?),
                None => None,
            };

            let page: T = response.json().await?;
            items.extend(extract(page));
        }

        Ok(items)
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn search_code(&self, query: &str, per_page: u8) -> Result<Vec<CodeSearchItem>> {
        let mut url = self.endpoint("search/code")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", "1");

        self.paginate(url, |page: SearchCodeResponse| page.items).await
    }

    async fn list_org_repositories(&self, org: &str, per_page: u8) -> Result<Vec<Repository>> {
        let mut url = self.endpoint(&format!("orgs/{}/repos", urlencoding::encode(org)))?;
        url.query_pairs_mut()
            .append_pair("type", "all")
            .append_pair("sort", "updated")
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", "1");

        self.paginate(url, |page: Vec<Repository>| page).await
    }

    async fn branch_head(&self, owner: &str, repo: &str, branch: &str) -> Result<String> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/branches/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encode_path(branch)
        ))?;

        let branch: BranchResponse = self.get_json(&url).await?;
        Ok(branch.commit.sha)
    }

    async fn tree(&self, owner: &str, repo: &str, tree_sha: &str) -> Result<Tree> {
        let mut url = self.endpoint(&format!(
            "repos/{}/{}/git/trees/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            urlencoding::encode(tree_sha)
        ))?;
        url.query_pairs_mut().append_pair("recursive", "1");

        self.get_json(&url).await
    }

    async fn content(&self, owner: &str, repo: &str, path: &str) -> Result<ContentResponse> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/contents/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo),
            encode_path(path)
        ))?;

        self.get_json(&url).await
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    let millis = 250u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

async fn api_error(response: Response) -> DepfinderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    DepfinderError::ApiError { status, message }
}

/// Percent-encode each segment of a slash separated path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn next_page_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if is_next {
            Some(
                target
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            )
        } else {
            None
        }
    })
}
