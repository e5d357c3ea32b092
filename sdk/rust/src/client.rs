use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Header carrying the API key on every call.
pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize, Deserialize)]
pub struct RunScriptRequest {
    pub script_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub script_name: String,
    pub parameters: Map<String, Value>,
    pub return_code: i32,
    pub success: bool,
    pub output: Value, // Decoded JSON when the script printed JSON, raw text otherwise
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScriptInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub help_text: Option<String>,
    pub modified_time: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScriptListing {
    pub scripts: Vec<ScriptInfo>,
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::builder()
                .pool_max_idle_per_host(0)
                .no_proxy()
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub async fn health(&self) -> Result<Response, reqwest::Error> {
        self.get("/health").await
    }

    pub async fn root(&self) -> Result<Response, reqwest::Error> {
        self.get("/").await
    }

    pub async fn list_scripts(&self) -> Result<Response, reqwest::Error> {
        self.get("/list-scripts").await
    }

    pub async fn script_info(&self, name: &str) -> Result<Response, reqwest::Error> {
        self.get(&format!("/script-info/{}", name)).await
    }

    /// Dispatch a script. Parameters keep their insertion order on the wire.
    pub async fn run_script(
        &self,
        name: &str,
        parameters: Option<Map<String, Value>>,
    ) -> Result<Response, reqwest::Error> {
        let body = RunScriptRequest {
            script_name: name.to_string(),
            parameters,
        };
        self.client
            .post(format!("{}/run-script", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
    }

    /// Same as [`GatewayClient::run_script`] but decodes a 200 response.
    pub async fn run_script_typed(
        &self,
        name: &str,
        parameters: Option<Map<String, Value>>,
    ) -> Result<DispatchResponse, Box<dyn std::error::Error>> {
        let resp = self.run_script(name, parameters).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(format!("Gateway returned error status {}: {}", status, text).into());
        }

        Ok(serde_json::from_str::<DispatchResponse>(&text)?)
    }

    async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
    }
}
