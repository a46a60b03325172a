use std::{sync::Arc, time::Duration};

use actix_web::HttpRequest;
use moka::{future::Cache, notification::RemovalCause};
use tracing::{debug, info};
use uuid::Uuid;

use super::state::{WizardEvent, WizardSession};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "wizard_session";
pub const SESSION_HEADER: &str = "X-Wizard-Session";

/// Session id from the wizard cookie, falling back to the header.
pub fn session_id(req: &HttpRequest) -> Option<Uuid> {
    let cookie = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
    let header = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    cookie
        .into_iter()
        .chain(header)
        .find_map(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// Per-session wizard state with expiry.
///
/// Entries that time out are treated as abandoned wizards; an abandoned
/// increment proposal is dropped with its session.
#[derive(Clone)]
pub struct WizardStore {
    cache: Cache<Uuid, WizardSession>,
}

impl WizardStore {
    pub fn new(ttl: Duration, idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .time_to_idle(idle)
            .eviction_listener(
                |session: Arc<Uuid>, mut wizard: WizardSession, cause: RemovalCause| {
                    if !cause.was_evicted() {
                        return;
                    }
                    // expiry is the only way into Abandoned besides DELETE /wizard
                    if wizard.advance(WizardEvent::Abandoned).is_ok() {
                        info!(
                            session = %session,
                            employee_id = wizard.state.employee_id,
                            document_type = %wizard.state.document_type,
                            pending_increment = wizard.pending_increment.is_some(),
                            "Wizard abandoned"
                        );
                    }
                },
            )
            .build();

        WizardStore { cache }
    }

    pub async fn get(&self, session: &Uuid) -> Option<WizardSession> {
        self.cache.get(session).await
    }

    /// Loads the wizard for a request or fails with `NoActiveWizard`.
    pub async fn require(&self, session: Option<Uuid>) -> Result<(Uuid, WizardSession), AppError> {
        let session = session.ok_or(AppError::NoActiveWizard)?;
        let wizard = self.get(&session).await.ok_or(AppError::NoActiveWizard)?;
        if wizard.stage.is_terminal() {
            return Err(AppError::NoActiveWizard);
        }
        Ok((session, wizard))
    }

    pub async fn put(&self, session: Uuid, wizard: WizardSession) {
        debug!(session = %session, stage = ?wizard.stage, "Wizard stored");
        self.cache.insert(session, wizard).await;
    }

    pub async fn remove(&self, session: &Uuid) -> Option<WizardSession> {
        self.cache.remove(session).await
    }
}
