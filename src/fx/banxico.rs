use super::{parse_sie_payload, Observation, RateFetcher, USD_MXN_SERIES};
use crate::error::{HoldingsError, Result};
use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

const SIE_BASE_URL: &str = "https://www.banxico.org.mx/SieAPIRest/service/v1/series";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the Banxico SIE REST API.
#[derive(Clone)]
pub struct BanxicoClient {
    client: Client,
    token: Option<String>,
    base_url: String,
    series_id: String,
}

impl BanxicoClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            base_url: SIE_BASE_URL.to_string(),
            series_id: USD_MXN_SERIES.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_series(mut self, series_id: impl Into<String>) -> Self {
        self.series_id = series_id.into();
        self
    }

    pub fn series_url(&self) -> String {
        format!("{}/{}/datos", self.base_url.trim_end_matches('/'), self.series_id)
    }
}

impl RateFetcher for BanxicoClient {
    fn fetch_observations(&self) -> Result<Vec<Observation>> {
        info!("Fetching FX data from Banxico SIE API...");

        let mut request = self
            .client
            .get(self.series_url())
            .header("Accept", "application/json");

        match &self.token {
            Some(token) => {
                info!("Using Banxico API token for authentication");
                request = request.header("Bmx-Token", token);
            }
            None => warn!(
                "No API token provided - API may require authentication. \
                 Set BANXICO_TOKEN or pass --token"
            ),
        }

        let response = request.send()?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(HoldingsError::FetchFailed(
                "Authentication failed. Banxico API requires a token.\n\
                 Get your token from: https://www.banxico.org.mx/SieAPIRest/service/v1/token\n\
                 Then set it using: export BANXICO_TOKEN='your-token' or use --token"
                    .to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(HoldingsError::FetchFailed(format!(
                "Banxico request failed (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text()?;
        parse_sie_payload(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_url() {
        let client = BanxicoClient::new(None).unwrap();
        assert_eq!(
            client.series_url(),
            "https://www.banxico.org.mx/SieAPIRest/service/v1/series/SF43718/datos"
        );

        let client = client.with_base_url("http://localhost:9000/").with_series("SF60653");
        assert_eq!(client.series_url(), "http://localhost:9000/SF60653/datos");
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let client = BanxicoClient::new(Some("  ".to_string())).unwrap();
        assert!(client.token.is_none());
    }
}
