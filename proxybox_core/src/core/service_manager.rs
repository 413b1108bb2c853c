use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::errors::ServiceError;
use super::operation::{Enablement, Operation, ProxyOutcome};
use super::tunnel::proxy_command;
use crate::config::ServiceConfig;
use crate::stores::system::{ENABLED, SERVER};
use crate::stores::{
    Access, EnvironmentStore, HostFields, HostId, KeyedStore, PlatformProxyStore, Scoped,
    SettingValue, SshConfigStore, StoreError,
};
use crate::uri::ProxyUri;

pub const HTTP_PROXY: &str = "http_proxy";
pub const HTTPS_PROXY: &str = "https_proxy";

const GITLAB: &str = "gitlab.com";
const GITLAB_ALT_SSH: &str = "altssh.gitlab.com";

/// Keeps the system proxy setting, the environment and the SSH config in
/// step.
///
/// The stores are injected at construction time; the manager is the only
/// component that writes to more than one of them. Writes are applied store
/// by store and are not rolled back if a later store fails.
pub struct ServiceManager<P, E, S> {
    system: P,
    environment: E,
    ssh: S,
    tunnel_helper: Option<PathBuf>,
}

impl ServiceManager<PlatformProxyStore, EnvironmentStore, SshConfigStore> {
    /// The real stores of this machine, located through `config`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            config.system_store(),
            EnvironmentStore::new(),
            SshConfigStore::with_output(&config.ssh_config_path, &config.ssh_output_path),
            config.tunnel_helper.clone(),
        )
    }
}

impl<P, E, S> ServiceManager<P, E, S>
where
    P: KeyedStore<Key = str, Value = SettingValue>,
    E: KeyedStore<Key = str, Value = String>,
    S: KeyedStore<Key = HostId, Value = HostFields>,
{
    pub fn new(system: P, environment: E, ssh: S, tunnel_helper: Option<PathBuf>) -> Self {
        Self {
            system,
            environment,
            ssh,
            tunnel_helper,
        }
    }

    pub fn system(&self) -> &P {
        &self.system
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn ssh(&self) -> &S {
        &self.ssh
    }

    /// Run one operation across all stores.
    ///
    /// `Read` and `Update` first report the current state. Every operation
    /// except `Read` then writes the new state to the system proxy store, the
    /// environment and the gitlab host blocks of the SSH config, and reports
    /// it. Each store is closed again on every path out of this function.
    pub fn operate_proxy(
        &mut self,
        operation: Operation,
        uri: Option<&ProxyUri>,
    ) -> Result<ProxyOutcome, ServiceError> {
        if operation.needs_uri() && uri.is_none() {
            return Err(ServiceError::MissingUri(operation));
        }

        let mut outcome = ProxyOutcome::default();
        let mut system = Scoped::open(&mut self.system, operation.access())?;

        if operation.reads_first() {
            let current = read_enablement(&*system)?;
            debug!("Current proxy state: {current}");
            outcome.previous = Some(current);
        }

        let will_enable = match operation {
            Operation::Read => {
                system.close()?;
                return Ok(outcome);
            }
            Operation::Update => !outcome
                .previous
                .as_ref()
                .is_some_and(Enablement::is_enabled),
            Operation::Enable => true,
            Operation::Disable => false,
        };
        let target = match (will_enable, uri) {
            (true, Some(uri)) => Some(uri),
            (true, None) => return Err(ServiceError::MissingUri(operation)),
            (false, _) => None,
        };

        apply_system(&mut *system, target)?;

        let mut environment = Scoped::open(&mut self.environment, Access::ReadWrite)?;
        apply_environment(&mut *environment, target)?;
        environment.close()?;

        let mut ssh = Scoped::open(&mut self.ssh, Access::ReadWrite)?;
        apply_ssh(&mut *ssh, target, self.tunnel_helper.as_deref())?;
        ssh.close()?;

        system.close()?;

        outcome.applied = Some(match target {
            Some(uri) => Enablement::Enabled(uri.netloc()),
            None => Enablement::Disabled,
        });
        Ok(outcome)
    }

    /// `apply` for a saved profile: no name disables the proxy, a known name
    /// enables it with the stored URI.
    ///
    /// An unknown name or an empty URI changes nothing and returns `None`.
    pub fn apply_profile<Q>(
        &mut self,
        profiles: &mut Q,
        name: Option<&str>,
    ) -> Result<Option<ProxyOutcome>, ServiceError>
    where
        Q: KeyedStore<Key = str, Value = String>,
    {
        let Some(name) = name else {
            return self.operate_proxy(Operation::Disable, None).map(Some);
        };

        let store = Scoped::open(profiles, Access::ReadOnly)?;
        let stored = store.get(name)?;
        store.close()?;

        match stored {
            Some(uri) if !uri.trim().is_empty() => {
                let uri = ProxyUri::parse(&uri)?;
                info!("Applying profile '{name}' ({})", uri.netloc());
                self.operate_proxy(Operation::Enable, Some(&uri)).map(Some)
            }
            Some(_) => {
                warn!("Profile '{name}' has an empty URI; nothing to apply");
                Ok(None)
            }
            None => {
                warn!("No profile named '{name}'; nothing to apply");
                Ok(None)
            }
        }
    }
}

/// Current state of the system proxy store.
///
/// An enabled flag without a server is read as disabled.
fn read_enablement<P>(system: &P) -> Result<Enablement, StoreError>
where
    P: KeyedStore<Key = str, Value = SettingValue> + ?Sized,
{
    let enabled = match system.get(ENABLED)? {
        None => false,
        Some(SettingValue::Flag(flag)) => flag,
        Some(SettingValue::Text(_)) => {
            return Err(StoreError::type_kind(system.name(), ENABLED, "a boolean"))
        }
    };
    if !enabled {
        return Ok(Enablement::Disabled);
    }

    match system.get(SERVER)? {
        Some(SettingValue::Text(server)) if !server.is_empty() => Ok(Enablement::Enabled(server)),
        _ => {
            warn!("{} is enabled but has no server; treating as disabled", system.name());
            Ok(Enablement::Disabled)
        }
    }
}

fn apply_system<P>(system: &mut P, target: Option<&ProxyUri>) -> Result<(), StoreError>
where
    P: KeyedStore<Key = str, Value = SettingValue> + ?Sized,
{
    match target {
        Some(uri) => {
            info!("{}: enabling {}", system.name(), uri.netloc());
            system.set(ENABLED, SettingValue::Flag(true))?;
            system.set(SERVER, SettingValue::Text(uri.netloc()))
        }
        None => {
            info!("{}: disabling", system.name());
            system.set(ENABLED, SettingValue::Flag(false))?;
            system.delete(SERVER)
        }
    }
}

fn apply_environment<E>(environment: &mut E, target: Option<&ProxyUri>) -> Result<(), StoreError>
where
    E: KeyedStore<Key = str, Value = String> + ?Sized,
{
    match target {
        Some(uri) => {
            info!("{}: setting {HTTP_PROXY} and {HTTPS_PROXY}", environment.name());
            environment.set(HTTP_PROXY, uri.http())?;
            environment.set(HTTPS_PROXY, uri.https())
        }
        None => {
            info!("{}: removing {HTTP_PROXY} and {HTTPS_PROXY}", environment.name());
            environment.delete(HTTP_PROXY)?;
            environment.delete(HTTPS_PROXY)
        }
    }
}

/// Exact `gitlab.com` or any subdomain of it.
pub fn is_gitlab_host(host_name: &str) -> bool {
    let host = host_name.trim().to_ascii_lowercase();
    host == GITLAB || host.ends_with(".gitlab.com")
}

/// Move every gitlab host block to (or back from) ssh-over-HTTPS on 443.
fn apply_ssh<S>(
    ssh: &mut S,
    target: Option<&ProxyUri>,
    tunnel_helper: Option<&Path>,
) -> Result<(), StoreError>
where
    S: KeyedStore<Key = HostId, Value = HostFields> + ?Sized,
{
    for host in ssh.keys()? {
        let Some(mut fields) = ssh.get(&host)? else {
            continue;
        };
        if !fields.get("HostName").is_some_and(is_gitlab_host) {
            continue;
        }

        match target {
            Some(uri) => {
                fields.set("HostName", GITLAB_ALT_SSH);
                fields.set("Port", "443");
                fields.set("TCPKeepAlive", "yes");
                match tunnel_helper {
                    Some(helper) => fields.set("ProxyCommand", proxy_command(helper, uri)),
                    None => {
                        fields.remove("ProxyCommand");
                    }
                }
                info!("{}: routing host {host} through {}", ssh.name(), uri.netloc());
            }
            None => {
                fields.set("HostName", GITLAB);
                fields.remove("Port");
                fields.remove("TCPKeepAlive");
                fields.remove("ProxyCommand");
                info!("{}: restoring host {host}", ssh.name());
            }
        }
        ssh.set(&host, fields)?;
    }
    Ok(())
}
