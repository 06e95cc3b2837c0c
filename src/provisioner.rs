//! Ephemeral Store Provisioner
//!
//! Starts a throwaway Postgres container and hands back a connection
//! descriptor. The container lives exactly as long as [`EphemeralPostgres`]:
//! [`EphemeralPostgres::release`] stops it explicitly, and `Drop` removes it
//! on any other exit path (error, panic, cancelled future).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

use crate::error::{HarnessError, Result};

const POSTGRES_PORT: u16 = 5432;
const POSTGRES_USER: &str = "postgres";
const POSTGRES_PASSWORD: &str = "postgres";
const POSTGRES_DB: &str = "postgres";

/// Image + version to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreImage {
    pub name: String,
    pub tag: String,
}

impl Default for StoreImage {
    fn default() -> Self {
        Self {
            name: "postgres".to_string(),
            tag: "latest".to_string(),
        }
    }
}

impl std::fmt::Display for StoreImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Connection string for a reachable store.
///
/// Only valid while the [`EphemeralPostgres`] that produced it is alive.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionDescriptor({})", redact(&self.0))
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&redact(&self.0))
    }
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let creds = &url[scheme_end + 3..at];
            let user = creds.split(':').next().unwrap_or_default();
            format!("{}{}:***{}", &url[..scheme_end + 3], user, &url[at..])
        }
        _ => url.to_string(),
    }
}

/// A running, isolated Postgres instance.
pub struct EphemeralPostgres {
    container: Option<ContainerAsync<Postgres>>,
    image: StoreImage,
    descriptor: ConnectionDescriptor,
}

impl EphemeralPostgres {
    /// Start `image` and wait until it accepts connections.
    ///
    /// Image pull failures, runtime errors and readiness timeouts all map to
    /// [`HarnessError::ProvisioningFailed`]. No retries.
    pub async fn acquire(image: &StoreImage, readiness_timeout: Duration) -> Result<Self> {
        tracing::info!("Starting container {}", image);

        let request = Postgres::default()
            .with_name(image.name.clone())
            .with_tag(image.tag.clone());

        let container = tokio::time::timeout(readiness_timeout, request.start())
            .await
            .map_err(|_| {
                HarnessError::ProvisioningFailed(format!(
                    "{} not ready within {:?}",
                    image, readiness_timeout
                ))
            })?
            .map_err(|e| HarnessError::ProvisioningFailed(format!("{}: {}", image, e)))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| HarnessError::ProvisioningFailed(format!("resolve host: {}", e)))?;
        let port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(|e| HarnessError::ProvisioningFailed(format!("resolve port: {}", e)))?;

        let descriptor = ConnectionDescriptor::new(format!(
            "postgres://{}:{}@{}:{}/{}",
            POSTGRES_USER, POSTGRES_PASSWORD, host, port, POSTGRES_DB
        ));
        tracing::info!("Container {} ready at {}", image, descriptor);

        Ok(Self {
            container: Some(container),
            image: image.clone(),
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn image(&self) -> &StoreImage {
        &self.image
    }

    /// Stop and remove the container now.
    pub async fn release(mut self) -> Result<()> {
        if let Some(container) = self.container.take() {
            tracing::info!("Destroying container: {}", self.image);
            container
                .rm()
                .await
                .map_err(|e| HarnessError::ProvisioningFailed(format!("remove container: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for EphemeralPostgres {
    fn drop(&mut self) {
        // ContainerAsync removes itself when dropped.
        if self.container.take().is_some() {
            tracing::info!("Destroying container: {}", self.image);
        }
    }
}
