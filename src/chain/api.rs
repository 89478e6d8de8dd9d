//! Client for the dashboard HTTP endpoint (`GET /api/dashboard/{address}`)

use tracing::{debug, warn};

use crate::dashboard::loader::DaoSource;
use crate::dashboard::{Address, RawDao};
use crate::error::DashboardError;

pub const DEFAULT_API_BASE_URL: &str = "https://nouns.build";

#[derive(Clone)]
pub struct DashboardApi {
    base_url: String,
    client: reqwest::Client,
}

impl DashboardApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn dashboard_url(&self, address: &Address) -> String {
        format!("{}/api/dashboard/{}", self.base_url, address)
    }
}

impl DaoSource for DashboardApi {
    async fn fetch_user_daos(&self, address: &Address) -> Result<Vec<RawDao>, DashboardError> {
        let url = self.dashboard_url(address);
        debug!(url = %url, "Fetching dashboard");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Dashboard request failed");
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fixtures::{address, dao, proposal};

    #[test]
    fn test_dashboard_url() {
        let api = DashboardApi::new("https://nouns.build/");
        assert_eq!(
            api.dashboard_url(&address()),
            "https://nouns.build/api/dashboard/0x000000000000000000000000000000000000dEaD"
        );
    }

    #[tokio::test]
    async fn test_fetch_user_daos() {
        let body = serde_json::to_string(&vec![dao("Builder", vec![proposal(1)])]).unwrap();
        let (base_url, requests) = testserver::serve(200, body, 1).await;

        let api = DashboardApi::new(base_url);
        let daos = api.fetch_user_daos(&address()).await.unwrap();

        assert_eq!(daos.len(), 1);
        assert_eq!(daos[0].name, "Builder");
        assert_eq!(daos[0].proposals[0].proposal_number, 1);

        let requests = requests.await.unwrap();
        assert!(requests[0].starts_with(
            "GET /api/dashboard/0x000000000000000000000000000000000000dEaD HTTP/1.1"
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let (base_url, _requests) = testserver::serve(500, "{\"error\":\"x\"}".to_string(), 1).await;

        let api = DashboardApi::new(base_url);
        let err = api.fetch_user_daos(&address()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let (base_url, _requests) = testserver::serve(200, "{\"not\":\"a list\"}".to_string(), 1).await;

        let api = DashboardApi::new(base_url);
        let err = api.fetch_user_daos(&address()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
    }
}
