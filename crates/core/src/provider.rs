use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use clap::{ArgMatches, Command};

use crate::{CreateOpts, Result, VmList};

/// Command-line flags a provider contributes to the orchestrator.
pub trait ProviderFlags: Send + Sync {
    /// Add this provider's flags to the `create` command.
    fn configure_create_flags(&self, cmd: Command) -> Command;

    /// Add this provider's flags to cluster-wide commands.
    fn configure_cluster_flags(&self, cmd: Command) -> Command {
        cmd
    }

    /// Copy parsed values for flags added by `configure_create_flags`.
    fn apply_create_flags(&mut self, matches: &ArgMatches) -> Result<()>;
}

/// Trait for machine provisioning backends.
///
/// Calls are expected to be made one at a time by a single orchestrator.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name that also appears in `Vm::provider`.
    fn name(&self) -> &str;

    fn flags(&self) -> &dyn ProviderFlags;

    fn flags_mut(&mut self) -> &mut dyn ProviderFlags;

    /// Provision one machine per name and wait until they are usable.
    async fn create(&self, names: &[String], opts: &CreateOpts) -> Result<()>;

    /// Release the given machines.
    async fn delete(&self, vms: &VmList) -> Result<()>;

    /// Extend the lease on the given machines.
    async fn extend(&self, vms: &VmList, lifetime: Duration) -> Result<()>;

    /// Every machine this provider currently knows about.
    async fn list(&self) -> Result<VmList>;

    /// Account used to log into the machines.
    async fn find_active_account(&self) -> Result<String>;

    async fn clean_ssh(&self) -> Result<()> {
        Ok(())
    }

    async fn config_ssh(&self) -> Result<()> {
        Ok(())
    }
}

/// Providers available to the orchestrator, keyed by name.
///
/// Callers build providers themselves and register only those that
/// initialised successfully.
#[derive(Default)]
pub struct Providers {
    inner: BTreeMap<String, Box<dyn Provider>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Box<dyn Provider>) {
        self.inner.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Provider> {
        self.inner.get(name).map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(|k| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Provider> {
        self.inner.values().map(|p| p.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Provider>> {
        self.inner.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFlags;

    impl ProviderFlags for NoFlags {
        fn configure_create_flags(&self, cmd: Command) -> Command {
            cmd
        }

        fn apply_create_flags(&mut self, _matches: &ArgMatches) -> Result<()> {
            Ok(())
        }
    }

    struct Fake {
        name: &'static str,
        flags: NoFlags,
    }

    #[async_trait]
    impl Provider for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn flags(&self) -> &dyn ProviderFlags {
            &self.flags
        }

        fn flags_mut(&mut self) -> &mut dyn ProviderFlags {
            &mut self.flags
        }

        async fn create(&self, _names: &[String], _opts: &CreateOpts) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _vms: &VmList) -> Result<()> {
            Ok(())
        }

        async fn extend(&self, _vms: &VmList, _lifetime: Duration) -> Result<()> {
            Ok(())
        }

        async fn list(&self) -> Result<VmList> {
            Ok(VmList::new())
        }

        async fn find_active_account(&self) -> Result<String> {
            Ok("tester".into())
        }
    }

    #[test]
    fn registers_providers_by_name() {
        let mut providers = Providers::new();
        assert!(providers.is_empty());

        providers.register(Box::new(Fake { name: "zeta", flags: NoFlags }));
        providers.register(Box::new(Fake { name: "alpha", flags: NoFlags }));

        assert_eq!(providers.names(), vec!["alpha", "zeta"]);
        assert!(providers.get("alpha").is_some());
        assert!(providers.get("bodega").is_none());
    }

    #[tokio::test]
    async fn default_ssh_hooks_are_no_ops() {
        let provider = Fake { name: "alpha", flags: NoFlags };
        provider.clean_ssh().await.unwrap();
        provider.config_ssh().await.unwrap();
        assert_eq!(provider.find_active_account().await.unwrap(), "tester");
    }
}
