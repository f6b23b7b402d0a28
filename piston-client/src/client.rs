use reqwest::{Client, Response};
use tracing::debug;

use crate::{
    config::PistonConfig,
    error::Error,
    types::{ExecuteRequest, ExecuteResponse, Runtime},
};

/// Client for a Piston-compatible execution API
#[derive(Debug, Clone)]
pub struct PistonClient {
    client: Client,
    config: PistonConfig,
}

impl PistonClient {
    /// Create a new PistonClient with the given configuration
    pub fn new(config: PistonConfig) -> Result<Self, Error> {
        if reqwest::Url::parse(&config.api_url).is_err() {
            return Err(Error::Configuration(format!(
                "invalid api url: {}",
                config.api_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PistonConfig {
        &self.config
    }

    /// Submit source code for execution
    pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, Error> {
        debug!(
            language = %request.language,
            version = %request.version,
            "submitting execution"
        );

        let response = self
            .client
            .post(self.config.endpoint("execute"))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json::<ExecuteResponse>()
            .await
            .map_err(Error::HttpClient)
    }

    /// List the runtimes the service currently has installed
    pub async fn runtimes(&self) -> Result<Vec<Runtime>, Error> {
        let response = self
            .client
            .get(self.config.endpoint("runtimes"))
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json::<Vec<Runtime>>()
            .await
            .map_err(Error::HttpClient)
    }
}

async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(Error::Api {
        status_code: status.as_u16(),
        message,
    })
}
