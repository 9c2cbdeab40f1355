use include_dir::{include_dir, Dir, DirEntry};

static DEFAULTS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/assets/defaults");
static EMPTY: Dir<'static> = Dir::new("", &[]);

/// A read-only set of resources compiled into the binary.
///
/// Lookup names are relative to the bundle root; a leading `/` is ignored so
/// that `"/schema.xml"` and `"schema.xml"` address the same entry.
#[derive(Debug, Clone, Copy)]
pub struct Bundle {
    dir: &'static Dir<'static>,
}

impl Bundle {
    /// The engine defaults: `solr.xml`, `solrconfig.xml` and `schema.xml`.
    pub fn defaults() -> Self {
        Self { dir: &DEFAULTS }
    }

    /// A bundle with no entries.
    pub fn empty() -> Self {
        Self { dir: &EMPTY }
    }

    pub fn get(&self, name: &str) -> Option<&'static [u8]> {
        let key = name.trim_start_matches('/');
        if key.is_empty() {
            return None;
        }
        self.dir.get_file(key).map(include_dir::File::contents)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All file names in the bundle, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(self.dir, &mut names);
        names.sort();
        names
    }
}

impl Default for Bundle {
    fn default() -> Self {
        Self::defaults()
    }
}

fn collect_names(dir: &Dir<'_>, out: &mut Vec<String>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub) => collect_names(sub, out),
            DirEntry::File(file) => out.push(file.path().to_string_lossy().into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_engine_documents() {
        let bundle = Bundle::defaults();
        assert_eq!(
            bundle.names(),
            vec!["schema.xml", "solr.xml", "solrconfig.xml"]
        );
    }

    #[test]
    fn leading_slash_is_ignored() {
        let bundle = Bundle::defaults();
        assert_eq!(bundle.get("/solr.xml"), bundle.get("solr.xml"));
        assert!(bundle.contains("/solr.xml"));
    }

    #[test]
    fn missing_entry_is_none() {
        let bundle = Bundle::defaults();
        assert!(bundle.get("missing.xml").is_none());
        assert!(bundle.get("").is_none());
        assert!(bundle.get("/").is_none());
    }

    #[test]
    fn empty_bundle_has_no_entries() {
        let bundle = Bundle::empty();
        assert!(bundle.names().is_empty());
        assert!(!bundle.contains("solr.xml"));
    }
}
