//! Records of the package index: projects, releases, and their files.

use crate::record::Identity;
use crate::store::Store;
use crate::types::{RecordId, Timestamp};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

static PRE_RELEASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(a|b|rc)(0|[1-9][0-9]*)").expect("pre-release pattern is valid"));

crate::record! {
    /// A package in the index.
    pub struct Project {
        pub name: String,
        #[serde(default)]
        pub created: Timestamp,
        #[serde(default)]
        pub documentation: Option<String>,
        #[serde(default)]
        pub total_size: u64,
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: Identity::transient(),
            name: name.into(),
            created: Timestamp::now(),
            documentation: None,
            total_size: 0,
        }
    }

    /// PEP 503 normalized name: separator runs become `-`, lower-cased.
    pub fn normalized_name(&self) -> String {
        SEPARATOR_RUNS.replace_all(&self.name, "-").to_lowercase()
    }
}

crate::record! {
    /// One version of a project.
    pub struct Release {
        pub project_id: RecordId,
        pub version: String,
        #[serde(default)]
        pub created: Timestamp,
        #[serde(default)]
        pub author: Option<String>,
        #[serde(default)]
        pub author_email: Option<String>,
        #[serde(default)]
        pub maintainer: Option<String>,
        #[serde(default)]
        pub maintainer_email: Option<String>,
        #[serde(default)]
        pub summary: Option<String>,
        #[serde(default)]
        pub description: BTreeMap<String, String>,
        #[serde(default)]
        pub keywords: Option<String>,
        #[serde(default)]
        pub classifiers: Vec<String>,
        #[serde(default)]
        pub license: Option<String>,
        #[serde(default)]
        pub platform: Option<String>,
        #[serde(default)]
        pub home_page: Option<String>,
        #[serde(default)]
        pub download_url: Option<String>,
        #[serde(default)]
        pub requires_python: Option<String>,
        #[serde(default)]
        pub dependencies: BTreeMap<String, Vec<String>>,
        #[serde(default)]
        pub project_urls: Vec<String>,
        #[serde(default)]
        pub uploader: Option<String>,
        #[serde(default)]
        pub uploaded_via: Option<String>,
        #[serde(default)]
        pub yanked: bool,
        #[serde(default)]
        pub yanked_reason: Option<String>,
    }
}

impl Release {
    pub fn new(project_id: RecordId, version: impl Into<String>) -> Self {
        Self {
            identity: Identity::transient(),
            project_id,
            version: version.into(),
            created: Timestamp::now(),
            author: None,
            author_email: None,
            maintainer: None,
            maintainer_email: None,
            summary: None,
            description: BTreeMap::new(),
            keywords: None,
            classifiers: Vec::new(),
            license: None,
            platform: None,
            home_page: None,
            download_url: None,
            requires_python: None,
            dependencies: BTreeMap::new(),
            project_urls: Vec::new(),
            uploader: None,
            uploaded_via: None,
            yanked: false,
            yanked_reason: None,
        }
    }

    /// Whether the version carries an alpha, beta or release-candidate tag.
    pub fn is_pre_release(&self) -> bool {
        PRE_RELEASE.is_match(&self.version)
    }

    /// Labelled links: home page, download URL, then `"Name, url"` entries
    /// of `project_urls`. A later label replaces an earlier one in place.
    pub fn urls(&self) -> Vec<(String, String)> {
        let mut urls: Vec<(String, String)> = Vec::new();
        let mut set = |name: &str, url: &str| {
            match urls.iter_mut().find(|(existing, _)| existing.as_str() == name) {
                Some(entry) => entry.1 = url.to_string(),
                None => urls.push((name.to_string(), url.to_string())),
            }
        };

        if let Some(home_page) = self.home_page.as_deref().filter(|s| !s.is_empty()) {
            set("Homepage", home_page);
        }
        if let Some(download) = self.download_url.as_deref().filter(|s| !s.is_empty()) {
            set("Download", download);
        }
        for spec in &self.project_urls {
            let (name, url) = spec.split_once(',').unwrap_or((spec.as_str(), ""));
            let (name, url) = (name.trim(), url.trim());
            if !name.is_empty() && !url.is_empty() {
                set(name, url);
            }
        }
        urls
    }

    /// Whether any of the metadata shown on a release page is present.
    pub fn has_meta(&self) -> bool {
        [
            &self.license,
            &self.keywords,
            &self.author,
            &self.author_email,
            &self.maintainer,
            &self.maintainer_email,
            &self.requires_python,
        ]
        .iter()
        .any(|field| field.as_deref().map_or(false, |s| !s.is_empty()))
    }
}

crate::record! {
    /// A distribution file of a release.
    pub struct File {
        pub release_id: RecordId,
        pub name: String,
        #[serde(default)]
        pub python_version: Option<String>,
        #[serde(default)]
        pub package_type: Option<String>,
        #[serde(default)]
        pub comment_text: Option<String>,
        #[serde(default = "unknown_size")]
        pub size: i64,
        #[serde(default)]
        pub has_signature: bool,
        #[serde(default)]
        pub md5_digest: Option<String>,
        #[serde(default)]
        pub sha256_digest: Option<String>,
        #[serde(default)]
        pub blake2_256_digest: Option<String>,
        #[serde(default)]
        pub upload_time: Timestamp,
        #[serde(default)]
        pub uploaded_via: Option<String>,
    }
}

fn unknown_size() -> i64 {
    -1
}

impl File {
    pub fn new(release_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            identity: Identity::transient(),
            release_id,
            name: name.into(),
            python_version: None,
            package_type: None,
            comment_text: None,
            size: unknown_size(),
            has_signature: false,
            md5_digest: None,
            sha256_digest: None,
            blake2_256_digest: None,
            upload_time: Timestamp::now(),
            uploaded_via: None,
        }
    }

    /// Name of the detached signature file.
    pub fn pgp_name(&self) -> String {
        format!("{}.asc", self.name)
    }
}

crate::record! {
    /// A file name ever uploaded, kept so names are never reused.
    pub struct FileName {
        pub name: String,
    }
}

impl FileName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: Identity::transient(),
            name: name.into(),
        }
    }
}

/// Register every package index record type with `store`.
///
/// Types already registered, for instance by an earlier query, are kept.
pub fn register_all(store: &Store) {
    store.ensure_registered::<Project>();
    store.ensure_registered::<Release>();
    store.ensure_registered::<File>();
    store.ensure_registered::<FileName>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[test]
    fn test_table_names() {
        assert_eq!(Project::table_name(), "project");
        assert_eq!(Release::table_name(), "release");
        assert_eq!(File::table_name(), "file");
        assert_eq!(FileName::table_name(), "filename");
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(Project::new("Foo.Bar__baz").normalized_name(), "foo-bar-baz");
        assert_eq!(Project::new("warehub").normalized_name(), "warehub");
    }

    #[test]
    fn test_pre_release() {
        assert!(Release::new(RecordId(0), "1.0a1").is_pre_release());
        assert!(Release::new(RecordId(0), "2.0rc10").is_pre_release());
        assert!(!Release::new(RecordId(0), "2.0").is_pre_release());
    }

    #[test]
    fn test_urls_order_and_override() {
        let mut release = Release::new(RecordId(0), "1.0");
        release.home_page = Some("https://example.org".into());
        release.project_urls = vec![
            "Source, https://github.com/x/y".into(),
            "Homepage, https://x.dev".into(),
            "broken".into(),
            ", https://nameless".into(),
        ];
        assert_eq!(
            release.urls(),
            vec![
                ("Homepage".to_string(), "https://x.dev".to_string()),
                ("Source".to_string(), "https://github.com/x/y".to_string()),
            ]
        );
    }

    #[test]
    fn test_has_meta() {
        let mut release = Release::new(RecordId(0), "1.0");
        assert!(!release.has_meta());
        release.license = Some(String::new());
        assert!(!release.has_meta());
        release.author = Some("me".into());
        assert!(release.has_meta());
    }

    #[test]
    fn test_register_all_after_query() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::new(crate::StoreConfig::in_dir(dir.path(), "data.json"));
        store.get::<Project>(None).unwrap();
        register_all(&store);

        // Every type is known, so a file holding all four tables loads.
        store.put_one(&mut Project::new("p")).unwrap();
        store.put_one(&mut Release::new(RecordId(0), "1.0")).unwrap();
        store.put_one(&mut File::new(RecordId(0), "p-1.0.tar.gz")).unwrap();
        store.put_one(&mut FileName::new("p-1.0.tar.gz")).unwrap();
        assert!(store.commit());

        let reopened = Store::new(crate::StoreConfig::in_dir(dir.path(), "data.json"));
        register_all(&reopened);
        register_all(&reopened);
        assert_eq!(reopened.len::<Release>().unwrap(), 1);
        assert_eq!(reopened.table_names().unwrap().len(), 4);
    }

    #[test]
    fn test_file_defaults() {
        let file: File = serde_json::from_value(serde_json::json!({
            "release_id": 2,
            "name": "pkg-1.0.tar.gz"
        }))
        .unwrap();
        assert_eq!(file.size, -1);
        assert_eq!(file.release_id, RecordId(2));
        assert_eq!(file.pgp_name(), "pkg-1.0.tar.gz.asc");
    }
}
