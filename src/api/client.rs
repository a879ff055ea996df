use reqwest::{Method, StatusCode};
use snafu::prelude::*;

use super::error::variant::*;
use super::Result;
use crate::{
    config::ApiConfig,
    ws::{AlertEvent, TelemetryRecord},
};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Telemetry HTTP API Client
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    config: ApiConfig,
}

impl Client {
    /// create a new api client using a bearer token
    pub fn new_from_bearer_token<S: AsRef<str> + ?Sized>(
        config: &ApiConfig,
        token: &S,
    ) -> Result<Self> {
        let token = token.as_ref();
        let mut auth_header_value: reqwest::header::HeaderValue = format!("Bearer {}", token)
            .parse()
            .map_err(|_| TokenInvalid.build())?;
        auth_header_value.set_sensitive(true);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth_header_value);

        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .context(ClientCreateFailed)?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn request<R>(&self, path: &str) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let url = self.config.url(path);

        let req = self
            .client
            .request(Method::GET, &url)
            .build()
            .context(BuildRequestFailed)?;

        log::debug!("GET {}", url);

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|_| RequestFailed {
                method: Method::GET,
                url: &url,
            })?;

        let status_code = resp.status();
        let body = resp.bytes().await.with_context(|_| RequestFailed {
            method: Method::GET,
            url: &url,
        })?;

        parse_response(Method::GET, &url, status_code, &body)
    }

    /// Fetch the vehicle listing, the baseline of the merge store
    pub async fn vehicles(&self) -> Result<Vec<TelemetryRecord>> {
        let vehicles: Vec<TelemetryRecord> = self.request(&self.config.vehicles_path).await?;
        log::debug!("Fetched {} vehicle(s)", vehicles.len());
        Ok(vehicles)
    }

    /// Fetch the currently active alerts
    pub async fn alerts(&self) -> Result<Vec<AlertEvent>> {
        let alerts: Vec<AlertEvent> = self.request(&self.config.alerts_path).await?;
        log::debug!("Fetched {} alert(s)", alerts.len());
        Ok(alerts)
    }
}

/// Check the status of a finished request and decode its json body.
fn parse_response<R>(method: Method, url: &str, status_code: StatusCode, body: &[u8]) -> Result<R>
where
    R: serde::de::DeserializeOwned,
{
    ensure!(
        status_code == StatusCode::OK,
        HTTPStatusNotOK {
            method,
            url,
            status_code
        }
    );

    serde_json::from_slice(body).with_context(|_| ParseBodyFailed {
        body: bytes::Bytes::copy_from_slice(body),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::Error;

    #[test]
    fn test_token_with_newline_is_invalid() {
        let err = Client::new_from_bearer_token(&ApiConfig::default(), "bad\ntoken").unwrap_err();
        assert!(matches!(err, Error::TokenInvalid));
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = Error::HTTPStatusNotOK {
            method: Method::GET,
            url: "http://localhost:3000/api/vehicles".to_string(),
            status_code: StatusCode::UNAUTHORIZED,
        };
        assert!(err.is_unauthorized());
    }

    const VEHICLES_URL: &str = "http://localhost:3000/api/vehicles";

    #[test]
    fn test_parse_vehicle_listing() {
        let body = serde_json::json!([
            {
                "dispositivo_id": 17,
                "nombre": "Camion 17",
                "estado": "activo",
                "velocidad": "42.5",
                "temperatura": 78,
                "latitud": -12.04,
                "longitud": "-77.03",
                "ultima_actualizacion": "2024-03-01T10:00:00Z",
            },
            { "dispositivo_id": "V2", "estado": "mantenimiento" },
        ])
        .to_string();

        let vehicles: Vec<TelemetryRecord> =
            parse_response(Method::GET, VEHICLES_URL, StatusCode::OK, body.as_bytes()).unwrap();

        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].vehicle_id, "17");
        assert_eq!(vehicles[0].speed, Some(42.5));
        assert_eq!(vehicles[0].temperature, Some(78.0));
        assert_eq!(vehicles[0].coordinates(), Some((-12.04, -77.03)));
        assert!(vehicles[0].updated_at.is_some());
        assert_eq!(vehicles[1].vehicle_id, "V2");
        assert_eq!(vehicles[1].speed, None);
    }

    #[test]
    fn test_parse_alert_listing() {
        let body = serde_json::json!([{
            "dispositivo_id": "V1",
            "tipo_alerta": "alerta de temperatura",
            "nombre": "Temperatura sobre el umbral",
            "fecha": 1_700_000_000_000_i64,
        }])
        .to_string();

        let alerts: Vec<AlertEvent> = parse_response(
            Method::GET,
            "http://localhost:3000/api/alerts",
            StatusCode::OK,
            body.as_bytes(),
        )
        .unwrap();

        assert_eq!(alerts[0].vehicle_id, "V1");
        assert_eq!(alerts[0].message, "Temperatura sobre el umbral");
        assert_eq!(alerts[0].timestamp.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_non_ok_status() {
        let err = parse_response::<Vec<TelemetryRecord>>(
            Method::GET,
            VEHICLES_URL,
            StatusCode::UNAUTHORIZED,
            b"[]",
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::HTTPStatusNotOK { ref url, status_code, .. }
                if url == VEHICLES_URL && status_code == StatusCode::UNAUTHORIZED
        ));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_undecodable_body() {
        let err = parse_response::<Vec<TelemetryRecord>>(
            Method::GET,
            VEHICLES_URL,
            StatusCode::OK,
            br#"{"error":"not a listing"}"#,
        )
        .unwrap_err();

        match err {
            Error::ParseBodyFailed { body, .. } => {
                assert_eq!(&body[..], br#"{"error":"not a listing"}"#)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
