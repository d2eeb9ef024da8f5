//! Provider HTTP client

use crate::classify::classify_response;
use crate::error::{Result, ScrapeError};
use crate::parser::{parse_access_token, parse_calendar};
use async_trait::async_trait;
use config::ProviderSettings;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use std::fmt::Debug;
use tracing::debug;
use types::{CalendarBatch, ScrapeTask};

/// Operations the scraper and token workers need from the flight provider
#[async_trait]
pub trait FlightProvider: Send + Sync + Debug {
    /// Flex-dates calendar around the task's target date
    async fn fetch_calendar(&self, task: &ScrapeTask, token: &str) -> Result<CalendarBatch>;

    /// Load the public search page for `probe` and extract a fresh bearer token
    async fn fetch_token(&self, probe: &ScrapeTask) -> Result<String>;

    /// One authenticated search; `Ok` means the token was accepted
    async fn probe_token(&self, token: &str, probe: &ScrapeTask) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| ScrapeError::Transport(format!("invalid user agent: {}", e)))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { http, settings })
    }

    fn search_query(&self, task: &ScrapeTask, flex_dates: bool) -> Vec<(&'static str, String)> {
        vec![
            ("adt", self.settings.adults.to_string()),
            ("inf", self.settings.infants.to_string()),
            ("chd", self.settings.children.to_string()),
            ("flexDates", flex_dates.to_string()),
            ("cabinClass", self.settings.cabin_class.clone()),
            ("flightType", "ONE_WAY".to_string()),
            (
                "leg",
                format!(
                    "{}-{}-{}",
                    task.route.origin(),
                    task.route.destination(),
                    task.target_date.format("%Y%m%d")
                ),
            ),
        ]
    }

    async fn get(
        &self,
        url: &str,
        task: &ScrapeTask,
        flex_dates: bool,
        token: Option<&str>,
    ) -> Result<String> {
        let mut request = self.http.get(url).query(&self.search_query(task, flex_dates));
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("GET {} for {} → {} ({}B)", url, task, status, body.len());

        classify_response(status, &body, &task.to_string())?;
        Ok(body)
    }
}

#[async_trait]
impl FlightProvider for ProviderClient {
    async fn fetch_calendar(&self, task: &ScrapeTask, token: &str) -> Result<CalendarBatch> {
        let body = self
            .get(&self.settings.api_base_url, task, true, Some(token))
            .await?;
        Ok(parse_calendar(
            &body,
            &self.settings.name,
            &self.settings.airline,
            task,
        )?)
    }

    async fn fetch_token(&self, probe: &ScrapeTask) -> Result<String> {
        let body = self
            .get(&self.settings.site_base_url, probe, false, None)
            .await?;
        parse_access_token(&body).ok_or(ScrapeError::TokenNotFound)
    }

    async fn probe_token(&self, token: &str, probe: &ScrapeTask) -> Result<()> {
        self.get(&self.settings.api_base_url, probe, false, Some(token))
            .await
            .map(|_| ())
    }
}
