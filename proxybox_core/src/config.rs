use std::io;
use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};

use crate::core::tunnel::locate_tunnel_helper;
use crate::stores::PlatformProxyStore;

/// Where every store lives. Built once per invocation and handed to the
/// service manager; nothing is read from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Saved profiles document.
    pub profiles_path: PathBuf,
    /// SSH client config that is read.
    pub ssh_config_path: PathBuf,
    /// Where the edited SSH client config is written.
    pub ssh_output_path: PathBuf,
    /// JSON file standing in for the system proxy setting off Windows.
    pub system_store_path: PathBuf,
    /// `connect` binary used to build `ProxyCommand`, if any.
    pub tunnel_helper: Option<PathBuf>,
}

impl ServiceConfig {
    /// `~/.config/proxybox/…` on Linux, `%APPDATA%\proxybox\…` on Windows,
    /// and the user's `~/.ssh/config`.
    ///
    /// This also searches `PATH` for the tunnel helper.
    pub fn from_default_dirs() -> io::Result<Self> {
        let proj = project_dirs()?;
        let base = BaseDirs::new()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate home dir"))?;

        let config_dir = proj.config_dir();
        let ssh_config = base.home_dir().join(".ssh").join("config");
        Ok(Self {
            profiles_path: config_dir.join("profiles.json"),
            ssh_output_path: ssh_config.clone(),
            ssh_config_path: ssh_config,
            system_store_path: config_dir.join("system_proxy.json"),
            tunnel_helper: locate_tunnel_helper(),
        })
    }

    /// Just the default profiles document, for commands that touch nothing
    /// else.
    pub fn default_profiles_path() -> io::Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("profiles.json"))
    }

    #[cfg(windows)]
    pub fn system_store(&self) -> PlatformProxyStore {
        PlatformProxyStore::new()
    }

    #[cfg(not(windows))]
    pub fn system_store(&self) -> PlatformProxyStore {
        PlatformProxyStore::new(&self.system_store_path)
    }
}

fn project_dirs() -> io::Result<ProjectDirs> {
    ProjectDirs::from("", "", "proxybox")
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))
}
