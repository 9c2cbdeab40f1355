use std::path::{Path, PathBuf};

/// Root directory for all state of one embedded engine instance.
///
/// Fixed once at bootstrap and never changed afterwards. The layout is:
///
/// ```text
/// <home>/solr.xml        container descriptor
/// <home>/<core>/         core data directory
/// <home>/.lock           held while an engine is running
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHome {
    root: PathBuf,
}

impl EngineHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Anchor a relative path at the current working directory.
    pub fn absolute(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root: PathBuf = root.into();
        if root.is_absolute() {
            return Ok(Self { root });
        }
        Ok(Self {
            root: std::env::current_dir()?.join(root),
        })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn core_dir(&self, core: &str) -> PathBuf {
        self.root.join(core)
    }

    #[inline]
    pub fn descriptor_path(&self, descriptor: &str) -> PathBuf {
        self.root.join(descriptor)
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let home = EngineHome::new("/srv/hearth/solr");
        assert_eq!(home.root(), Path::new("/srv/hearth/solr"));
        assert_eq!(
            home.core_dir("nakamura"),
            PathBuf::from("/srv/hearth/solr/nakamura")
        );
        assert_eq!(
            home.descriptor_path("solr.xml"),
            PathBuf::from("/srv/hearth/solr/solr.xml")
        );
        assert_eq!(home.lock_file(), PathBuf::from("/srv/hearth/solr/.lock"));
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        let home = EngineHome::absolute("/srv/solr").unwrap();
        assert_eq!(home.root(), Path::new("/srv/solr"));
    }

    #[test]
    fn absolute_anchors_relative_paths() {
        let home = EngineHome::absolute("solr").unwrap();
        assert!(home.root().is_absolute());
        assert!(home.root().ends_with("solr"));
    }
}
