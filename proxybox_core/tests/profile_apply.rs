use std::fs;

use log::LevelFilter;
use proxybox_core::core::HTTP_PROXY;
use proxybox_core::stores::{FileProxyStore, KeyedStore, SshConfigStore};
use proxybox_core::{Enablement, ProfileStore, ServiceError, ServiceManager};

mod common;
use common::memory_store::MemoryStore;

type Manager = ServiceManager<FileProxyStore, MemoryStore<String>, SshConfigStore>;

fn setup() -> anyhow::Result<(tempfile::TempDir, Manager, ProfileStore)> {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let dir = tempfile::tempdir()?;
    let ssh_path = dir.path().join("ssh_config");
    fs::write(&ssh_path, "Host gl\n    HostName gitlab.com\n")?;

    let manager = ServiceManager::new(
        FileProxyStore::new(dir.path().join("system_proxy.json")),
        MemoryStore::new(),
        SshConfigStore::new(ssh_path),
        None,
    );
    let profiles = ProfileStore::new(dir.path().join("profiles.json"));
    Ok((dir, manager, profiles))
}

#[test]
fn created_profile_is_applied() -> anyhow::Result<()> {
    let (_dir, mut manager, mut profiles) = setup()?;
    profiles.set("work", "https://proxy.corp:8080".into())?;

    let outcome = manager
        .apply_profile(&mut profiles, Some("work"))?
        .expect("known profile is applied");

    assert_eq!(
        outcome.applied,
        Some(Enablement::Enabled("proxy.corp:8080".into()))
    );
    assert_eq!(
        manager.environment().values.get(HTTP_PROXY).map(String::as_str),
        Some("http://proxy.corp:8080")
    );
    Ok(())
}

#[test]
fn unknown_or_empty_profile_changes_nothing() -> anyhow::Result<()> {
    let (dir, mut manager, mut profiles) = setup()?;
    profiles.set("blank", "  ".into())?;

    assert_eq!(manager.apply_profile(&mut profiles, Some("missing"))?, None);
    assert_eq!(manager.apply_profile(&mut profiles, Some("blank"))?, None);

    assert!(!dir.path().join("system_proxy.json").exists());
    assert_eq!(manager.environment().opens, 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("ssh_config"))?,
        "Host gl\n    HostName gitlab.com\n"
    );
    Ok(())
}

#[test]
fn bare_apply_disables() -> anyhow::Result<()> {
    let (_dir, mut manager, mut profiles) = setup()?;
    profiles.set("work", "http://10.0.0.1:3128".into())?;
    manager.apply_profile(&mut profiles, Some("work"))?;

    let outcome = manager
        .apply_profile(&mut profiles, None)?
        .expect("bare apply always runs");
    assert_eq!(outcome.emitted(), vec![&Enablement::Disabled]);
    assert!(manager.environment().values.is_empty());
    Ok(())
}

#[test]
fn malformed_profile_uri_is_an_error() -> anyhow::Result<()> {
    let (_dir, mut manager, mut profiles) = setup()?;
    profiles.set("bad", "not a uri".into())?;

    let err = manager
        .apply_profile(&mut profiles, Some("bad"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Uri(_)));
    assert_eq!(manager.environment().opens, 0);
    Ok(())
}
