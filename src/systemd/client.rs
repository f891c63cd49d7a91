// Systemd D-Bus status probe using zbus

use crate::error::{ProbeError, Result};
use crate::systemd::{ConnectionManager, MonitoredUnit, StatusProbe, StatusSnapshot};
use async_trait::async_trait;
use zbus::names::InterfaceName;
use zbus::Connection;

const SYSTEMD_DEST: &str = "org.freedesktop.systemd1";
const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";
const SERVICE_INTERFACE: &str = "org.freedesktop.systemd1.Service";

/// Probe that reads unit properties straight from the systemd manager over D-Bus
pub struct DbusProbe {
    connection_manager: ConnectionManager,
}

impl Default for DbusProbe {
    fn default() -> Self {
        Self::new(ConnectionManager::default())
    }
}

impl DbusProbe {
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self { connection_manager }
    }

    /// Bus address of a user's service manager
    pub fn user_bus_address(owner: &str) -> Result<String> {
        let user = nix::unistd::User::from_name(owner)?
            .ok_or_else(|| anyhow::anyhow!("No such user '{}'", owner))?;
        Ok(format!("unix:path=/run/user/{}/bus", user.uid))
    }

    async fn connect(&self, unit: &MonitoredUnit) -> std::result::Result<Connection, ProbeError> {
        let connection = match unit {
            MonitoredUnit::System { .. } => self.connection_manager.connect_system().await,
            MonitoredUnit::User { owner, .. } => {
                let owner = owner
                    .as_deref()
                    .ok_or_else(|| ProbeError::MissingOwner { unit: unit.id() })?;
                match Self::user_bus_address(owner) {
                    Ok(address) => self.connection_manager.connect_address(&address).await,
                    Err(e) => Err(e),
                }
            }
        };

        connection.map_err(|e| query_error(unit, e))
    }

    async fn read_properties(&self, connection: &Connection, unit_name: &str) -> Result<(String, String, Option<String>)> {
        self.connection_manager.with_retry("read_unit_properties", || async {
            let proxy = zbus::Proxy::new(
                connection,
                SYSTEMD_DEST,
                "/org/freedesktop/systemd1",
                "org.freedesktop.systemd1.Manager",
            )
            .await?;

            // LoadUnit works for units that are not currently loaded, unlike GetUnit
            let unit_path: zbus::zvariant::OwnedObjectPath = proxy.call("LoadUnit", &(unit_name,)).await?;

            let props_proxy = zbus::fdo::PropertiesProxy::builder(connection)
                .destination(SYSTEMD_DEST)?
                .path(unit_path.as_str())?
                .build()
                .await?;

            let unit_iface = InterfaceName::from_static_str_unchecked(UNIT_INTERFACE);
            let active_state = props_proxy
                .get(unit_iface.clone(), "ActiveState")
                .await
                .ok()
                .and_then(|v| v.downcast_ref::<String>().ok())
                .unwrap_or_default();
            let sub_state = props_proxy
                .get(unit_iface, "SubState")
                .await
                .ok()
                .and_then(|v| v.downcast_ref::<String>().ok())
                .unwrap_or_default();

            // Only service units carry a Result property
            let result = props_proxy
                .get(InterfaceName::from_static_str_unchecked(SERVICE_INTERFACE), "Result")
                .await
                .ok()
                .and_then(|v| v.downcast_ref::<String>().ok());

            Ok((active_state, sub_state, result))
        })
        .await
    }
}

#[async_trait]
impl StatusProbe for DbusProbe {
    async fn probe(&self, unit: &MonitoredUnit) -> std::result::Result<StatusSnapshot, ProbeError> {
        let connection = self.connect(unit).await?;

        let (active_state, sub_state, result) = self
            .read_properties(&connection, unit.name())
            .await
            .map_err(|e| query_error(unit, e))?;

        tracing::debug!("D-Bus properties for {}: {}/{}/{:?}", unit, active_state, sub_state, result);

        if active_state.is_empty() {
            return Err(ProbeError::MissingProperty {
                unit: unit.id(),
                property: "ActiveState",
            });
        }
        if sub_state.is_empty() {
            return Err(ProbeError::MissingProperty {
                unit: unit.id(),
                property: "SubState",
            });
        }

        Ok(StatusSnapshot::new(active_state, sub_state, result))
    }
}

fn query_error(unit: &MonitoredUnit, error: anyhow::Error) -> ProbeError {
    ProbeError::Query {
        unit: unit.id(),
        message: error.to_string(),
    }
}
