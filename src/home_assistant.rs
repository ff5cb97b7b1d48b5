use crate::config::required_var;
use crate::errors::{NetMeterError, NetMeterResult};
use reqwest::StatusCode;
use serde_derive::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, error};

/// Thin client for the Home Assistant REST state store
#[derive(Clone)]
pub struct HomeAssistantAPI {
    endpoint_url: String,
    auth_token: String,
    client: reqwest::Client,
}

impl HomeAssistantAPI {
    pub fn new(endpoint_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let endpoint_url: String = endpoint_url.into();
        Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Builds the client from `HA_URL` and `HA_TOKEN`
    pub fn from_env() -> NetMeterResult<Self> {
        Ok(Self::new(required_var("HA_URL")?, required_var("HA_TOKEN")?))
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub async fn read_sensor_value(&mut self, entity_id: &str) -> NetMeterResult<HASensor> {
        if self.endpoint_url.is_empty() {
            return Err(NetMeterError::NoConnection);
        }
        debug!("Reading {entity_id}");
        let response = self
            .client
            .get(self.state_url(entity_id))
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(Self::status_error(entity_id, status, response).await),
        }
    }

    /// Creates or overwrites the state of `entity_id` in Home Assistant
    pub async fn publish_state(
        &mut self,
        entity_id: &str,
        state: &str,
        attributes: Map<String, Value>,
    ) -> NetMeterResult<HASensor> {
        if self.endpoint_url.is_empty() {
            return Err(NetMeterError::NoConnection);
        }
        let response = self
            .client
            .post(self.state_url(entity_id))
            .bearer_auth(&self.auth_token)
            .json(&json!({ "state": state, "attributes": attributes }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
            status => Err(Self::status_error(entity_id, status, response).await),
        }
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/api/states/{}", self.endpoint_url, entity_id)
    }

    async fn status_error(
        entity_id: &str,
        status: StatusCode,
        response: reqwest::Response,
    ) -> NetMeterError {
        match status {
            StatusCode::NOT_FOUND => NetMeterError::EntityNotFound(entity_id.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NetMeterError::Unauthorized,
            status => {
                let message = response.text().await.unwrap_or_default();
                error!("HA returned {status} for {entity_id}: {message}");
                NetMeterError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }
}

impl fmt::Debug for HomeAssistantAPI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeAssistantAPI")
            .field("endpoint_url", &self.endpoint_url)
            .finish_non_exhaustive()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HASensor {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: String,
    #[serde(default)]
    pub last_reported: String,
    #[serde(default)]
    pub last_updated: String,
}

#[cfg(test)]
mod test_ha_wrapper {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_home_assistant_api() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/api/states/sensor.grid_power")
            .match_header("Authorization", "Bearer test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"
                {
                    "entity_id": "sensor.grid_power",
                    "state": "-212.5",
                    "attributes": {"unit_of_measurement": "W"},
                    "last_changed": "2023-01-01T12:00:00Z",
                    "last_reported": "2023-01-01T12:00:00Z",
                    "last_updated": "2023-01-01T12:00:00Z"
                }
            "#,
            )
            .create_async()
            .await;

        let mut api = HomeAssistantAPI::new(server.url(), "test_token");
        let result = api.read_sensor_value("sensor.grid_power").await.unwrap();

        assert_eq!(result.entity_id, "sensor.grid_power");
        assert_eq!(result.state, "-212.5");
        assert_eq!(result.attributes["unit_of_measurement"], "W");
        assert_eq!(result.last_changed, "2023-01-01T12:00:00Z");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_home_assistant_api_missing_timestamps() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/states/sensor.solar_amps")
            .with_status(200)
            .with_body(r#"{"entity_id": "sensor.solar_amps", "state": "unknown"}"#)
            .create_async()
            .await;

        let mut api = HomeAssistantAPI::new(server.url(), "test_token");
        let result = api.read_sensor_value("sensor.solar_amps").await.unwrap();

        assert_eq!(result.state, "unknown");
        assert!(result.attributes.is_empty());
        assert!(result.last_updated.is_empty());
    }

    #[tokio::test]
    async fn test_home_assistant_api_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/states/sensor.missing")
            .with_status(404)
            .create_async()
            .await;

        let mut api = HomeAssistantAPI::new(server.url(), "test_token");
        let result = api.read_sensor_value("sensor.missing").await;

        assert!(matches!(result, Err(NetMeterError::EntityNotFound(id)) if id == "sensor.missing"));
    }

    #[tokio::test]
    async fn test_home_assistant_api_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/states/sensor.grid_power")
            .with_status(401)
            .create_async()
            .await;

        let mut api = HomeAssistantAPI::new(server.url(), "bad_token");
        let result = api.read_sensor_value("sensor.grid_power").await;

        assert!(matches!(result, Err(NetMeterError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_home_assistant_api_no_connection() {
        let mut api = HomeAssistantAPI::new("", "");
        let result = api.read_sensor_value("sensor.grid_power").await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "No HA connection");
    }

    #[tokio::test]
    async fn test_publish_state() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/api/states/sensor.net_meter_import_power")
            .match_header("Authorization", "Bearer test_token")
            .match_body(Matcher::PartialJson(json!({
                "state": "150.25",
                "attributes": {"unit_of_measurement": "W"}
            })))
            .with_status(201)
            .with_body(
                r#"{"entity_id": "sensor.net_meter_import_power", "state": "150.25",
                    "attributes": {"unit_of_measurement": "W"}}"#,
            )
            .create_async()
            .await;

        let mut attributes = Map::new();
        attributes.insert("unit_of_measurement".to_string(), json!("W"));

        let mut api = HomeAssistantAPI::new(format!("{}/", server.url()), "test_token");
        let result = api
            .publish_state("sensor.net_meter_import_power", "150.25", attributes)
            .await
            .unwrap();

        assert_eq!(result.state, "150.25");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_state_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/states/sensor.net_meter_export_power")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let mut api = HomeAssistantAPI::new(server.url(), "test_token");
        let result = api
            .publish_state("sensor.net_meter_export_power", "0", Map::new())
            .await;

        match result {
            Err(NetMeterError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected API error, got {other:?}"),
        }
    }
}
