//! Configuration loading for evidex.
//! Reads evidex.toml from the current directory, the path in EVIDEX_CONFIG,
//! or a path given on the command line.

use evidex_common::{DuplicatePolicy, EvidexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "EVIDEX_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "evidex.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Where the datasets are pulled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_evidence_dir")]
    pub evidence_dir: String,
    #[serde(default = "default_target_dir")]
    pub target_dir: String,
    #[serde(default = "default_disease_dir")]
    pub disease_dir: String,
}

const RELEASE_ROOT: &str = "/pub/databases/opentargets/platform/21.11/output/etl/json";

fn default_server_url()   -> String { "ftp://ftp.ebi.ac.uk".to_string() }
fn default_evidence_dir() -> String { format!("{RELEASE_ROOT}/evidence/sourceId=eva") }
fn default_target_dir()   -> String { format!("{RELEASE_ROOT}/targets") }
fn default_disease_dir()  -> String { format!("{RELEASE_ROOT}/diseases") }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            evidence_dir: default_evidence_dir(),
            target_dir: default_target_dir(),
            disease_dir: default_disease_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Downloaded datasets land in `<data_dir>/{evidence,targets,diseases}`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_assocs_file")]
    pub assocs_file: String,
    #[serde(default = "default_common_diseases_file")]
    pub common_diseases_file: String,
}

fn default_output_dir()           -> PathBuf { PathBuf::from("./data/output") }
fn default_assocs_file()          -> String  { "assocs.json".to_string() }
fn default_common_diseases_file() -> String  { "common_diseases.txt".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            assocs_file: default_assocs_file(),
            common_diseases_file: default_common_diseases_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Worker count for downloads, decoding and the pair scan.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_min_shared")]
    pub min_shared_diseases: usize,
    /// An association counts toward co-occurrence when its median is strictly above this.
    #[serde(default)]
    pub qualifying_median_above: f64,
    #[serde(default)]
    pub duplicate_metadata: DuplicatePolicy,
}

fn default_workers()    -> usize { 1 }
fn default_min_shared() -> usize { 2 }

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            min_shared_diseases: default_min_shared(),
            qualifying_median_above: 0.0,
            duplicate_metadata: DuplicatePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration without validating it.
    ///
    /// An explicit `path` must exist. Without one, `EVIDEX_CONFIG` and then
    /// `./evidex.toml` are tried; when neither names an existing file the
    /// defaults are used. Callers apply their overrides and then call
    /// [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => (PathBuf::from(p), true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(EvidexError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| EvidexError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| EvidexError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.transform;
        if t.workers == 0 {
            return Err(EvidexError::Config("transform.workers must be at least 1".into()));
        }
        if t.min_shared_diseases == 0 {
            return Err(EvidexError::Config(
                "transform.min_shared_diseases must be at least 1".into(),
            ));
        }
        if !t.qualifying_median_above.is_finite() {
            return Err(EvidexError::Config(
                "transform.qualifying_median_above must be a finite number".into(),
            ));
        }

        let s = &self.server;
        for (name, value) in [
            ("server.url", &s.url),
            ("server.evidence_dir", &s.evidence_dir),
            ("server.target_dir", &s.target_dir),
            ("server.disease_dir", &s.disease_dir),
        ] {
            if value.trim().is_empty() {
                return Err(EvidexError::Config(format!("{name} must not be empty")));
            }
        }

        if self.output.assocs_file.is_empty() || self.output.common_diseases_file.is_empty() {
            return Err(EvidexError::Config("output file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn assocs_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.assocs_file)
    }

    pub fn common_diseases_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.common_diseases_file)
    }
}
