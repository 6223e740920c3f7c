//! Layered build configuration
//!
//! Config is loaded with layered precedence (highest wins):
//! 1. CLI flags (applied by the caller on the resolved config)
//! 2. Environment variables: `WARDROBE_*`, plus `CI` for strict mode
//! 3. Project-local: `./wardrobe.toml`
//! 4. Global: `~/.wardrobe/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use wardrobe_core::{Result, WardrobeError};
use wardrobe_import::TextureNaming;
use wardrobe_schema::{DecentralandResolver, MetadataSettings};

pub const PROJECT_CONFIG_FILE: &str = "wardrobe.toml";
pub const DEFAULT_CONCURRENCY: usize = 20;

/// How assets are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    #[default]
    Parallel,
    /// One asset at a time, for diagnosing failures
    Serial,
}

/// Which files feed an asset's folder-level identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderIdScope {
    /// The extracted files only: models and their textures
    #[default]
    Contents,
    /// Extracted files plus `asset.json`, the thumbnail and the preview image
    AllFiles,
}

impl fmt::Display for FolderIdScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderIdScope::Contents => write!(f, "contents"),
            FolderIdScope::AllFiles => write!(f, "all-files"),
        }
    }
}

impl FromStr for FolderIdScope {
    type Err = WardrobeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "contents" => Ok(FolderIdScope::Contents),
            "all-files" | "all_files" => Ok(FolderIdScope::AllFiles),
            other => Err(WardrobeError::Config(format!(
                "unknown folder id scope '{}' (expected contents or all-files)",
                other
            ))),
        }
    }
}

/// Config file structure. Every field is optional so files can be layered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfigFile {
    #[serde(default)]
    pub assets_root: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub content_base_url: Option<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub mode: Option<ProcessingMode>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub texture_naming: Option<TextureNaming>,
    #[serde(default)]
    pub folder_id_scope: Option<FolderIdScope>,
    #[serde(default)]
    pub base_collections: Option<Vec<String>>,
    #[serde(default)]
    pub default_collection: Option<String>,
    #[serde(default)]
    pub collection_addresses: BTreeMap<String, String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Resolved configuration with every layer applied
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub assets_root: PathBuf,
    pub output_dir: PathBuf,
    pub content_base_url: Option<String>,
    pub concurrency: usize,
    pub mode: ProcessingMode,
    pub strict: bool,
    pub texture_naming: TextureNaming,
    pub folder_id_scope: FolderIdScope,
    pub base_collections: Vec<String>,
    pub default_collection: String,
    pub collection_addresses: BTreeMap<String, String>,
    /// Fixed epoch millis for reproducible output; wall clock when unset
    pub timestamp: Option<i64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let settings = MetadataSettings::default();
        Self {
            assets_root: PathBuf::from("assets"),
            output_dir: PathBuf::from("dist"),
            content_base_url: None,
            concurrency: DEFAULT_CONCURRENCY,
            mode: ProcessingMode::default(),
            strict: false,
            texture_naming: TextureNaming::default(),
            folder_id_scope: FolderIdScope::default(),
            base_collections: settings.base_collections,
            default_collection: settings.default_collection,
            collection_addresses: BTreeMap::new(),
            timestamp: None,
        }
    }
}

impl BuildConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = BuildConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(PROJECT_CONFIG_FILE);
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Self::resolve(config)
    }

    /// Load config from a specific file path plus the environment
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Self::resolve(config)
    }

    /// Settings handed to the metadata builder
    pub fn metadata_settings(&self) -> MetadataSettings {
        MetadataSettings {
            default_collection: self.default_collection.clone(),
            base_collections: self.base_collections.clone(),
            content_base_url: self.content_base_url.clone(),
        }
    }

    /// Identifier resolver for this configuration
    pub fn resolver(&self) -> DecentralandResolver {
        DecentralandResolver::new(
            self.base_collections.clone(),
            self.collection_addresses.clone(),
        )
    }

    /// The timestamp stamped on every entity of the run
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }

    /// `assets_root` as an absolute path with symlinks resolved, so folder
    /// paths in reports do not depend on the working directory
    pub fn absolute_assets_root(&self) -> Result<PathBuf> {
        self.assets_root.canonicalize().map_err(|e| {
            WardrobeError::Config(format!(
                "assets root {} is not usable: {}",
                self.assets_root.display(),
                e
            ))
        })
    }

    /// Reject settings no build can run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(WardrobeError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.default_collection.trim().is_empty() {
            return Err(WardrobeError::Config(
                "default_collection must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".wardrobe").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<BuildConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: BuildConfigFile = toml::from_str(&content).map_err(|e| {
            WardrobeError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut BuildConfigFile, overlay: BuildConfigFile) {
        if overlay.assets_root.is_some() {
            base.assets_root = overlay.assets_root;
        }
        if overlay.output_dir.is_some() {
            base.output_dir = overlay.output_dir;
        }
        if overlay.content_base_url.is_some() {
            base.content_base_url = overlay.content_base_url;
        }
        if overlay.concurrency.is_some() {
            base.concurrency = overlay.concurrency;
        }
        if overlay.mode.is_some() {
            base.mode = overlay.mode;
        }
        if overlay.strict.is_some() {
            base.strict = overlay.strict;
        }
        if overlay.texture_naming.is_some() {
            base.texture_naming = overlay.texture_naming;
        }
        if overlay.folder_id_scope.is_some() {
            base.folder_id_scope = overlay.folder_id_scope;
        }
        if overlay.base_collections.is_some() {
            base.base_collections = overlay.base_collections;
        }
        if overlay.default_collection.is_some() {
            base.default_collection = overlay.default_collection;
        }
        base.collection_addresses.extend(overlay.collection_addresses);
        if overlay.timestamp.is_some() {
            base.timestamp = overlay.timestamp;
        }
    }

    fn apply_env_overrides<F>(config: &mut BuildConfigFile, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = var("WARDROBE_ASSETS_ROOT") {
            config.assets_root = Some(PathBuf::from(root));
        }
        if let Some(dir) = var("WARDROBE_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var("WARDROBE_CONTENT_BASE_URL") {
            config.content_base_url = Some(url);
        }
        if let Some(value) = var("WARDROBE_CONCURRENCY") {
            let n = value.trim().parse::<usize>().map_err(|_| {
                WardrobeError::Config(format!("WARDROBE_CONCURRENCY is not a number: '{}'", value))
            })?;
            config.concurrency = Some(n);
        }
        if var("WARDROBE_SERIAL").is_some_and(|v| is_truthy(&v)) {
            config.mode = Some(ProcessingMode::Serial);
        }
        if var("WARDROBE_STRICT").is_some_and(|v| is_truthy(&v))
            || var("CI").is_some_and(|v| is_truthy(&v))
        {
            config.strict = Some(true);
        }
        Ok(())
    }

    fn resolve(file: BuildConfigFile) -> Result<Self> {
        let defaults = BuildConfig::default();
        let config = BuildConfig {
            assets_root: file.assets_root.unwrap_or(defaults.assets_root),
            output_dir: file.output_dir.unwrap_or(defaults.output_dir),
            content_base_url: file.content_base_url,
            concurrency: file.concurrency.unwrap_or(defaults.concurrency),
            mode: file.mode.unwrap_or(defaults.mode),
            strict: file.strict.unwrap_or(defaults.strict),
            texture_naming: file.texture_naming.unwrap_or(defaults.texture_naming),
            folder_id_scope: file.folder_id_scope.unwrap_or(defaults.folder_id_scope),
            base_collections: file.base_collections.unwrap_or(defaults.base_collections),
            default_collection: file
                .default_collection
                .unwrap_or(defaults.default_collection),
            collection_addresses: file.collection_addresses,
            timestamp: file.timestamp,
        };
        config.validate()?;
        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wardrobe_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BuildConfig::resolve(BuildConfigFile::default()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.mode, ProcessingMode::Parallel);
        assert_eq!(config.texture_naming, TextureNaming::RelativePath);
        assert_eq!(config.folder_id_scope, FolderIdScope::Contents);
        assert_eq!(config.base_collections, vec!["base-avatars"]);
        assert_eq!(config.default_collection, "base-exclusive");
        assert!(!config.strict);
    }

    #[test]
    fn test_load_config_from_file() {
        let path = temp_config(
            r#"
assets_root = "/srv/assets"
concurrency = 4
mode = "serial"
texture_naming = "content_hash"
folder_id_scope = "all_files"
timestamp = 1600000000000

[collection_addresses]
halloween_2019 = "0xc1f4b0eea2bd6690930e6c66efd3e197d620b9c2"
"#,
        );
        let file = BuildConfig::load_file(&path).unwrap();
        let config = BuildConfig::resolve(file).unwrap();

        assert_eq!(config.assets_root, PathBuf::from("/srv/assets"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.mode, ProcessingMode::Serial);
        assert_eq!(config.texture_naming, TextureNaming::ContentHash);
        assert_eq!(config.folder_id_scope, FolderIdScope::AllFiles);
        assert_eq!(config.timestamp_millis(), 1_600_000_000_000);
        assert_eq!(config.collection_addresses.len(), 1);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = BuildConfigFile {
            output_dir: Some(PathBuf::from("global-out")),
            concurrency: Some(8),
            ..Default::default()
        };
        base.collection_addresses.insert("a".to_string(), "0x1".to_string());

        let mut overlay = BuildConfigFile {
            output_dir: Some(PathBuf::from("project-out")),
            ..Default::default()
        };
        overlay.collection_addresses.insert("b".to_string(), "0x2".to_string());

        BuildConfig::merge_into(&mut base, overlay);
        assert_eq!(base.output_dir, Some(PathBuf::from("project-out")));
        assert_eq!(base.concurrency, Some(8));
        assert_eq!(base.collection_addresses.len(), 2);
    }

    #[test]
    fn test_env_overrides() {
        let mut file = BuildConfigFile {
            concurrency: Some(8),
            ..Default::default()
        };
        BuildConfig::apply_env_overrides(
            &mut file,
            env(&[
                ("WARDROBE_CONCURRENCY", "2"),
                ("WARDROBE_SERIAL", "1"),
                ("CI", "true"),
            ]),
        )
        .unwrap();
        let config = BuildConfig::resolve(file).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.mode, ProcessingMode::Serial);
        assert!(config.strict);
    }

    #[test]
    fn test_falsy_env_values_ignored() {
        let mut file = BuildConfigFile::default();
        BuildConfig::apply_env_overrides(&mut file, env(&[("CI", "false"), ("WARDROBE_SERIAL", "0")]))
            .unwrap();
        assert_eq!(file.strict, None);
        assert_eq!(file.mode, None);
    }

    #[test]
    fn test_bad_concurrency() {
        let mut file = BuildConfigFile::default();
        let err = BuildConfig::apply_env_overrides(&mut file, env(&[("WARDROBE_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(matches!(err, WardrobeError::Config(_)));

        let zero = BuildConfigFile {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(BuildConfig::resolve(zero).is_err());
    }

    #[test]
    fn test_absolute_assets_root() {
        let config = BuildConfig {
            assets_root: PathBuf::from("."),
            ..BuildConfig::default()
        };
        let root = config.absolute_assets_root().unwrap();
        assert!(root.is_absolute());
        assert_eq!(root, std::env::current_dir().unwrap().canonicalize().unwrap());

        let missing = BuildConfig {
            assets_root: std::env::temp_dir().join(format!("wardrobe_missing_{}", uuid::Uuid::new_v4())),
            ..BuildConfig::default()
        };
        assert!(matches!(
            missing.absolute_assets_root(),
            Err(WardrobeError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let path = temp_config("concurrency = \"lots\"");
        assert!(matches!(
            BuildConfig::load_from_file(&path),
            Err(WardrobeError::Config(_))
        ));
        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_folder_id_scope_from_str() {
        assert_eq!("contents".parse::<FolderIdScope>().unwrap(), FolderIdScope::Contents);
        assert_eq!("all-files".parse::<FolderIdScope>().unwrap(), FolderIdScope::AllFiles);
        assert!("everything".parse::<FolderIdScope>().is_err());
    }
}
