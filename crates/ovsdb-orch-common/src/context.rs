//! Collaborator bundle injected into orchestrators.

use std::fmt;
use std::sync::Arc;

use crate::capability::{ClusterService, DeviceService, DriverService};

/// External services an orchestrator talks to.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct OrchContext {
    /// Authoritative device inventory
    pub devices: Arc<dyn DeviceService>,
    /// Driver handles (controller registration)
    pub drivers: Arc<dyn DriverService>,
    /// Cluster membership
    pub cluster: Arc<dyn ClusterService>,
}

impl OrchContext {
    pub fn new(
        devices: Arc<dyn DeviceService>,
        drivers: Arc<dyn DriverService>,
        cluster: Arc<dyn ClusterService>,
    ) -> Self {
        Self {
            devices,
            drivers,
            cluster,
        }
    }

    /// Builds a context from one object serving all three roles.
    pub fn from_shared<T>(services: Arc<T>) -> Self
    where
        T: DeviceService + DriverService + ClusterService + 'static,
    {
        Self {
            devices: services.clone(),
            drivers: services.clone(),
            cluster: services,
        }
    }
}

impl fmt::Debug for OrchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchContext").finish_non_exhaustive()
    }
}
