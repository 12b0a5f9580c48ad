//! Current session: identity provider plus the backend connection built for
//! the provider's identity.
//!
//! The connection is rebuilt whenever identity changes. Rebuilds are
//! generation-numbered so a slow, older rebuild cannot overwrite a newer one.
//! While the connection does not match the provider's current identity the
//! backend counts as not ready.

use std::sync::{Arc, PoisonError, RwLock};

use positivity_core::{CallerIdentity, LoginStatus, Prerequisite, Principal, SyncError, SyncResult};
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendConnector, IdentityProvider};

#[derive(Default)]
struct Connection {
    backend: Option<Arc<dyn Backend>>,
    principal: Option<Principal>,
    generation: u64,
}

pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    connector: Arc<dyn BackendConnector>,
    connection: RwLock<Connection>,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>, connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            provider,
            connector,
            connection: RwLock::new(Connection::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub fn identity(&self) -> Option<CallerIdentity> {
        self.provider.identity()
    }

    pub fn status(&self) -> LoginStatus {
        self.provider.status()
    }

    /// (Re)build the backend connection for the provider's current identity.
    pub async fn connect(&self) -> SyncResult<()> {
        let identity = self.provider.identity();
        let generation = {
            let mut conn = self.connection.write().unwrap_or_else(PoisonError::into_inner);
            conn.generation += 1;
            conn.backend = None;
            conn.principal = None;
            conn.generation
        };

        let result = self.connector.connect(identity.as_ref()).await;

        let mut conn = self.connection.write().unwrap_or_else(PoisonError::into_inner);
        if conn.generation != generation {
            debug!(generation, current = conn.generation, "Connection superseded");
            return Ok(());
        }
        match result {
            Ok(backend) => {
                conn.backend = Some(backend);
                conn.principal = identity.map(|id| id.principal);
                info!(
                    generation,
                    principal = conn.principal.as_ref().map(Principal::as_str),
                    "Backend connection ready"
                );
                Ok(())
            }
            Err(err) => {
                warn!(generation, error = %err, "Backend connection failed");
                Err(err.into())
            }
        }
    }

    /// The backend, if connected for the current identity.
    pub fn backend(&self) -> SyncResult<Arc<dyn Backend>> {
        let identity = self.provider.identity();
        self.matching_backend(identity.as_ref().map(|id| &id.principal))
    }

    /// The backend together with the caller identity, for caller-scoped calls.
    pub fn caller(&self) -> SyncResult<(Arc<dyn Backend>, CallerIdentity)> {
        let identity = self
            .provider
            .identity()
            .ok_or(SyncError::not_ready(Prerequisite::Identity))?;
        let backend = self.matching_backend(Some(&identity.principal))?;
        Ok((backend, identity))
    }

    pub fn is_ready(&self) -> bool {
        self.backend().is_ok()
    }

    fn matching_backend(&self, principal: Option<&Principal>) -> SyncResult<Arc<dyn Backend>> {
        let conn = self.connection.read().unwrap_or_else(PoisonError::into_inner);
        match &conn.backend {
            Some(backend) if conn.principal.as_ref() == principal => Ok(Arc::clone(backend)),
            _ => Err(SyncError::not_ready(Prerequisite::Backend)),
        }
    }
}
