use snafu::prelude::*;

use crate::{
    alert::AlertHandler,
    api,
    config::{ApiConfig, Config},
    error,
    ws::{AlertEvent, Connector, Manager, WebsocketConnector},
    Result,
};

/// A dashboard session: baseline from the REST api, live data from the push
/// connection, both merged in one [`Manager`].
#[derive(Debug)]
pub struct Session<C = WebsocketConnector> {
    manager: Manager<C>,
    api_client: Option<api::Client>,
}

impl Session {
    /// Start a session for `token` over websocket, as described by `config`.
    ///
    /// Without a token no connection is permitted, and the session stays idle with
    /// an empty snapshot.
    pub async fn start<H: AlertHandler>(
        config: &Config,
        token: Option<&str>,
        handler: H,
    ) -> Result<Self> {
        Self::start_with(Manager::from_config(config, handler), &config.api, token).await
    }
}

impl<C: Connector> Session<C> {
    /// Start a session driving an already built `manager`.
    pub async fn start_with(
        manager: Manager<C>,
        api: &ApiConfig,
        token: Option<&str>,
    ) -> Result<Self> {
        let token = match token.filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => {
                log::warn!("No token, session stays idle");
                return Ok(Self {
                    manager,
                    api_client: None,
                });
            }
        };

        let api_client =
            api::Client::new_from_bearer_token(api, token).context(error::CallAPIFailed)?;

        log::info!("Create api and websocket client success");

        let session = Self {
            manager,
            api_client: Some(api_client),
        };

        session.refresh_baseline().await?;
        session.manager.connect(Some(token));

        Ok(session)
    }

    /// Re-fetch the vehicle listing, merge it under the live data and make it the
    /// roster. Vehicles new to the roster are subscribed right away.
    pub async fn refresh_baseline(&self) -> Result<()> {
        let client = match self.api_client {
            Some(ref c) => c,
            None => return Ok(()),
        };

        log::info!("Fetching baseline vehicles ...");

        let vehicles = client.vehicles().await.context(error::CallAPIFailed)?;
        let ids: Vec<String> = vehicles.iter().map(|v| v.vehicle_id.clone()).collect();

        self.manager.seed(vehicles);
        self.manager.set_entities(ids);

        Ok(())
    }

    /// Fetch the currently active alerts
    pub async fn active_alerts(&self) -> Result<Vec<AlertEvent>> {
        match self.api_client {
            Some(ref c) => c.alerts().await.context(error::CallAPIFailed),
            None => Ok(Vec::new()),
        }
    }

    /// the live connection manager
    pub fn manager(&self) -> &Manager<C> {
        &self.manager
    }

    /// Tear down the live connection
    pub fn close(&self) {
        self.manager.disconnect()
    }
}
