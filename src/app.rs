use std::sync::Arc;

use tracing::info;

use crate::api::ApiClient;
use crate::config::Config;
use crate::db::SqliteSlots;
use crate::error::Result;
use crate::session::SessionStore;
use crate::session::guard::{Access, Route, guard};
use crate::workflow::PatientBoard;

/// Application root: built once at startup and handed to every view.
pub struct AppState {
    pub api: ApiClient,
    pub session: Arc<SessionStore<SqliteSlots>>,
    pub board: PatientBoard,
}

impl AppState {
    /// Opens the session database and restores whoever was signed in last.
    pub async fn start(config: &Config) -> Result<Self> {
        let slots = SqliteSlots::connect(&config.session_db).await?;
        let session = Arc::new(SessionStore::new(slots));
        session.restore().await;

        let api = ApiClient::new(config.api_url.clone(), config.request_timeout)?;
        info!(api_url = %api.base_url(), "client ready");

        Ok(Self {
            api,
            session,
            board: PatientBoard::new(),
        })
    }

    pub fn guard(&self, route: Route) -> Access {
        guard(route, self.session.as_ref())
    }

    pub fn bearer(&self) -> Option<String> {
        self.session.access_token()
    }
}
