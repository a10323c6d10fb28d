use crate::config::ClientConfig;
use crate::filters::{DemographicFilters, PageQuery};
use crate::types::{PayrollPage, PeriodEntry, PeriodsResponse, UniqueCountResponse};
use crate::ClientError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

const PAYROLL_PATH: &str = "/api/payroll";
const PERIODS_PATH: &str = "/api/payroll/periodos";
const UNIQUE_COUNT_PATH: &str = "/api/payroll/demographic/unique-count";

/// Where payroll rows come from.
#[async_trait]
pub trait PayrollSource: Send + Sync {
    /// One page of rows. A `success: false` answer is an error.
    async fn fetch_page(
        &self,
        filters: &DemographicFilters,
        query: PageQuery,
    ) -> Result<PayrollPage, ClientError>;

    async fn fetch_periods(&self) -> Result<Vec<PeriodEntry>, ClientError>;

    /// Server-side count of distinct IDs for the filters.
    async fn fetch_unique_count(&self, filters: &DemographicFilters) -> Result<u64, ClientError>;
}

pub struct HttpPayrollSource {
    client: Client,
    base_url: String,
}

impl HttpPayrollSource {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, params = params.len(), "GET");
        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl PayrollSource for HttpPayrollSource {
    async fn fetch_page(
        &self,
        filters: &DemographicFilters,
        query: PageQuery,
    ) -> Result<PayrollPage, ClientError> {
        let page: PayrollPage = self.get_json(PAYROLL_PATH, &query.params(filters)).await?;
        if !page.success {
            return Err(ClientError::Api(
                page.error
                    .unwrap_or_else(|| format!("page {} was not successful", query.page)),
            ));
        }
        Ok(page)
    }

    async fn fetch_periods(&self) -> Result<Vec<PeriodEntry>, ClientError> {
        let resp: PeriodsResponse = self.get_json(PERIODS_PATH, &[]).await?;
        if !resp.success {
            return Err(ClientError::Api(
                resp.error.unwrap_or_else(|| "period list unavailable".to_string()),
            ));
        }
        Ok(resp.data.unwrap_or_default())
    }

    async fn fetch_unique_count(&self, filters: &DemographicFilters) -> Result<u64, ClientError> {
        let resp: UniqueCountResponse = self
            .get_json(UNIQUE_COUNT_PATH, &filters.to_params())
            .await?;
        match (resp.success, resp.unique_curp_count) {
            (true, Some(count)) => Ok(count),
            (true, None) => Ok(0),
            (false, _) => Err(ClientError::Api(
                resp.error.unwrap_or_else(|| "unique count unavailable".to_string()),
            )),
        }
    }
}
