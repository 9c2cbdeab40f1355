use crate::{Bundle, DeployError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Result of staging a single default file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The bundled default was written to this path.
    Deployed(PathBuf),
    /// A file already existed at this path and was left untouched.
    AlreadyPresent(PathBuf),
}

impl DeployOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DeployOutcome::Deployed(p) | DeployOutcome::AlreadyPresent(p) => p,
        }
    }

    pub fn was_deployed(&self) -> bool {
        matches!(self, DeployOutcome::Deployed(_))
    }
}

/// Copies bundled defaults into a directory, never replacing existing files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFileDeployer {
    bundle: Bundle,
}

impl DefaultFileDeployer {
    pub fn new(bundle: Bundle) -> Self {
        Self { bundle }
    }

    pub fn deploy(&self, dest_dir: &Path, name: &str) -> Result<DeployOutcome, DeployError> {
        if !dest_dir.is_dir() {
            if let Err(e) = fs::create_dir_all(dest_dir) {
                warn!(
                    "unable to create {} for {name}, deployment may fail: {e}",
                    dest_dir.display()
                );
            }
        }

        let dest = dest_dir.join(name);
        if dest.exists() {
            debug!("{} already present, leaving it alone", dest.display());
            return Ok(DeployOutcome::AlreadyPresent(dest));
        }

        let contents = self
            .bundle
            .get(name)
            .ok_or_else(|| DeployError::MissingDefault(name.to_owned()))?;

        // The temp file is removed on drop if any step below fails.
        let copy_err = |source| DeployError::Copy {
            path: dest.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dest_dir).map_err(copy_err)?;
        tmp.write_all(contents).map_err(copy_err)?;
        tmp.as_file().sync_all().map_err(copy_err)?;

        match tmp.persist_noclobber(&dest) {
            Ok(_) => {}
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!("{} appeared during deployment, keeping it", dest.display());
                return Ok(DeployOutcome::AlreadyPresent(dest));
            }
            Err(e) => return Err(copy_err(e.error)),
        }

        info!("deployed default {name} to {}", dest.display());
        Ok(DeployOutcome::Deployed(dest))
    }

    /// Deploy several defaults into the same directory, stopping at the first error.
    pub fn deploy_all(
        &self,
        dest_dir: &Path,
        names: &[&str],
    ) -> Result<Vec<DeployOutcome>, DeployError> {
        names
            .iter()
            .map(|name| self.deploy(dest_dir, name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directory_and_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("solr").join("home");
        let deployer = DefaultFileDeployer::default();

        let outcome = deployer.deploy(&home, "solr.xml").unwrap();
        assert!(outcome.was_deployed());
        assert!(home.is_dir());
        assert_eq!(
            fs::read(home.join("solr.xml")).unwrap(),
            Bundle::defaults().get("solr.xml").unwrap()
        );
    }

    #[test]
    fn second_deploy_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let deployer = DefaultFileDeployer::default();

        let first = deployer.deploy(dir.path(), "solr.xml").unwrap();
        assert!(first.was_deployed());
        let modified = fs::metadata(first.path()).unwrap().modified().unwrap();

        let second = deployer.deploy(dir.path(), "solr.xml").unwrap();
        assert_eq!(second, DeployOutcome::AlreadyPresent(dir.path().join("solr.xml")));
        assert_eq!(
            fs::metadata(second.path()).unwrap().modified().unwrap(),
            modified
        );
        assert_eq!(
            fs::read(second.path()).unwrap(),
            Bundle::defaults().get("solr.xml").unwrap()
        );
    }

    #[test]
    fn existing_customization_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("solr.xml");
        fs::write(&dest, "<solr persistent=\"true\"/>").unwrap();

        let outcome = DefaultFileDeployer::default()
            .deploy(dir.path(), "solr.xml")
            .unwrap();
        assert!(!outcome.was_deployed());
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "<solr persistent=\"true\"/>"
        );
    }

    #[test]
    fn unknown_default_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DefaultFileDeployer::default()
            .deploy(dir.path(), "elevate.xml")
            .unwrap_err();
        assert!(matches!(err, DeployError::MissingDefault(n) if n == "elevate.xml"));
        assert!(!dir.path().join("elevate.xml").exists());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        DefaultFileDeployer::default()
            .deploy(dir.path(), "schema.xml")
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["schema.xml"]);
    }

    #[test]
    fn deploy_all_reports_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.xml"), "<schema/>").unwrap();

        let outcomes = DefaultFileDeployer::default()
            .deploy_all(dir.path(), &["solr.xml", "schema.xml"])
            .unwrap();
        assert!(outcomes[0].was_deployed());
        assert!(!outcomes[1].was_deployed());
    }
}
