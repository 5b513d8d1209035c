//! Startup sequence: validate config, resolve the service account, prepare
//! the data directory, then run the license cycle.

use crate::client::config::LicenseServerConfig;
use crate::config::store::ConfigStore;
use crate::manager::{LicenseManager, LicenseStatus};
use crate::system::directory::{OsUserDirectory, UserDirectory};
use crate::system::identity::{ensure_data_directory, ensure_user};
use crate::system::SystemUser;
use crate::CosmicError;
use std::sync::Arc;

/// What the bootstrap resolved.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    /// The service account that owns the data directory.
    pub user: SystemUser,

    /// Outcome of the license cycle.
    pub license: LicenseStatus,
}

/// Runs the startup sequence once.
pub struct Bootstrap {
    directory: Arc<dyn UserDirectory>,
    licenses: LicenseManager,
}

impl Bootstrap {
    /// Bootstrap against the host's user directory.
    pub fn new(license_config: LicenseServerConfig) -> Result<Self, CosmicError> {
        Self::with_directory_inner(license_config, Arc::new(OsUserDirectory))
    }

    /// Bootstrap against a custom user directory (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_directory(
        license_config: LicenseServerConfig,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, CosmicError> {
        Self::with_directory_inner(license_config, directory)
    }

    fn with_directory_inner(
        license_config: LicenseServerConfig,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, CosmicError> {
        let licenses = LicenseManager::new(license_config)?;
        Ok(Self {
            directory,
            licenses,
        })
    }

    /// Run the sequence against an already loaded store.
    ///
    /// Configuration and identity errors are returned; license exchange
    /// failures are absorbed into [`LicenseStatus`].
    pub fn run(
        &self,
        store: &mut ConfigStore,
        prefer_dns_only: bool,
    ) -> Result<BootstrapReport, CosmicError> {
        store.config().validate()?;

        let user = {
            let _span = tracing::info_span!("system_identity").entered();
            let user = ensure_user(store, self.directory.as_ref())?;
            ensure_data_directory(store, &user)?;
            user
        };

        let license = {
            let _span = tracing::info_span!("license", dns_only = prefer_dns_only).entered();
            self.licenses.check_license(store, prefer_dns_only)?
        };

        tracing::info!(
            username = %user.username,
            uid = user.uid,
            gid = user.gid,
            %license,
            "bootstrap complete"
        );
        Ok(BootstrapReport { user, license })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::try_lock_exclusive;
    use crate::protocol::models::LicenseType;
    use crate::system::directory::MockUserDirectory;
    use std::fs::{self, OpenOptions};
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The mock user takes the temp dir owner's ids so chown succeeds unprivileged.
    fn fixture(dir: &TempDir) -> (ConfigStore, Arc<MockUserDirectory>) {
        let meta = fs::metadata(dir.path()).unwrap();
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            format!(
                "system:\n  username: panelsvc\n  data: {}\n",
                dir.path().join("data").display()
            ),
        )
        .unwrap();

        let users = Arc::new(MockUserDirectory::new().with_user("panelsvc", meta.uid(), meta.gid()));
        (ConfigStore::open(path).unwrap(), users)
    }

    fn offline_config() -> LicenseServerConfig {
        LicenseServerConfig {
            probe_addr: "no-such-host.invalid:80".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bootstrap_without_route_skips_license() {
        let dir = TempDir::new().unwrap();
        let (mut store, users) = fixture(&dir);

        let bootstrap = Bootstrap::with_directory(offline_config(), users).unwrap();
        let report = bootstrap.run(&mut store, false).unwrap();

        assert_eq!(report.user.username, "panelsvc");
        assert_eq!(report.license, LicenseStatus::Skipped);
        assert!(dir.path().join("data").is_dir());

        let on_disk = ConfigStore::load_from(store.path()).unwrap();
        assert_eq!(on_disk.config().system.as_ref().unwrap().user.uid, report.user.uid);
    }

    #[test]
    fn test_bootstrap_invalid_config_aborts_before_identity() {
        let dir = TempDir::new().unwrap();
        let (mut store, users) = fixture(&dir);
        store.config_mut().panel.as_mut().unwrap().port = 0;

        let bootstrap = Bootstrap::with_directory(offline_config(), users.clone()).unwrap();
        let result = bootstrap.run(&mut store, false);

        assert!(matches!(result, Err(CosmicError::ConfigError(_))));
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_bootstrap_lookup_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (mut store, _) = fixture(&dir);
        let users = Arc::new(MockUserDirectory::new().failing_lookup("directory unavailable"));

        let bootstrap = Bootstrap::with_directory(offline_config(), users).unwrap();
        let result = bootstrap.run(&mut store, false);
        assert!(matches!(result, Err(CosmicError::UserLookup(_))));
    }

    #[test]
    fn test_bootstrap_locked_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (mut store, users) = fixture(&dir);
        let holder = OpenOptions::new().write(true).open(store.path()).unwrap();
        try_lock_exclusive(&holder).unwrap();

        let bootstrap = Bootstrap::with_directory(offline_config(), users).unwrap();
        let result = bootstrap.run(&mut store, false);

        assert!(matches!(result, Err(CosmicError::ConfigLocked { .. })));
        assert!(!dir.path().join("data").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bootstrap_full_sequence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"valid": true, "licenseType": 4})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let (mut store, users) = fixture(&dir);
        let config = LicenseServerConfig {
            verify_url: format!("{}/verify", server.uri()),
            request_url: format!("{}/request", server.uri()),
            probe_addr: "127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let (report, store) = tokio::task::spawn_blocking(move || {
            let bootstrap = Bootstrap::with_directory(config, users).unwrap();
            let report = bootstrap.run(&mut store, true).unwrap();
            (report, store)
        })
        .await
        .unwrap();

        assert_eq!(
            report.license,
            LicenseStatus::Verified {
                valid: true,
                license_type: LicenseType::Trial
            }
        );
        let on_disk = ConfigStore::load_from(store.path()).unwrap();
        assert_eq!(on_disk.config().license.unwrap().license_type, LicenseType::Trial);
        assert_eq!(on_disk.config().system.as_ref().unwrap().username, "panelsvc");
    }
}
