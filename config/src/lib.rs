//! Shade Configuration
//!
//! Shared configuration crate for the Shade client components.
//!
//! Handles loading configuration from:
//! 1. SHADE_CONFIG env var (explicit path)
//! 2. ./shade.toml (current directory)
//! 3. ~/.shade/shade.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "shade.toml";
const CONFIG_DIR_NAME: &str = ".shade";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_ARTIFACTS_DIR: &str = "./circuits";
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_BACKUP_DIR: &str = "./shade-backups";
const DEFAULT_BACKUP_RETENTION: usize = 10;
const DEFAULT_KDF_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_KDF_ITERATIONS: u32 = 2;
const DEFAULT_ROOT_HISTORY: usize = 100;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadeConfig {
    #[serde(default)]
    pub prover: ProverConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub hash: HashConfig,
    #[serde(default)]
    pub merkle: MerkleConfig,
}

/// Proof backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProverBackendToml {
    #[default]
    Mock,
    Groth16,
}

impl FromStr for ProverBackendToml {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "groth16" => Ok(Self::Groth16),
            other => Err(format!("unknown prover backend: {other}")),
        }
    }
}

/// Prover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default)]
    pub backend: ProverBackendToml,
    /// Directory holding `{kind}.pk` / `{kind}.vk`
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub proof_timeout_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub verify_locally: bool,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            backend: ProverBackendToml::Mock,
            artifacts_dir: DEFAULT_ARTIFACTS_DIR.into(),
            workers: DEFAULT_WORKERS,
            proof_timeout_secs: None,
            verify_locally: true,
        }
    }
}

fn default_artifacts_dir() -> String {
    DEFAULT_ARTIFACTS_DIR.into()
}
fn default_workers() -> usize {
    DEFAULT_WORKERS
}
fn default_true() -> bool {
    true
}

/// What happens to a secret after it has been withdrawn or swapped
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SpentPolicyToml {
    #[default]
    Retain,
    MarkSpent,
}

impl FromStr for SpentPolicyToml {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "mark-spent" | "mark_spent" => Ok(Self::MarkSpent),
            other => Err(format!("unknown spent policy: {other}")),
        }
    }
}

/// Secret store and backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub spent_policy: SpentPolicyToml,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// Backup files kept; 0 keeps all
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default = "default_kdf_memory")]
    pub kdf_memory_kib: u32,
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            spent_policy: SpentPolicyToml::Retain,
            backup_dir: DEFAULT_BACKUP_DIR.into(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            kdf_memory_kib: DEFAULT_KDF_MEMORY_KIB,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

fn default_backup_dir() -> String {
    DEFAULT_BACKUP_DIR.into()
}
fn default_backup_retention() -> usize {
    DEFAULT_BACKUP_RETENTION
}
fn default_kdf_memory() -> u32 {
    DEFAULT_KDF_MEMORY_KIB
}
fn default_kdf_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

/// Two-to-one hash used for commitments, nullifiers and the tree
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HasherToml {
    #[default]
    Poseidon,
    /// Test-only linear hash
    Linear,
}

impl FromStr for HasherToml {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poseidon" => Ok(Self::Poseidon),
            "linear" => Ok(Self::Linear),
            other => Err(format!("unknown hasher: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashConfig {
    #[serde(default)]
    pub hasher: HasherToml,
}

/// Merkle root trust configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleConfig {
    /// Number of recent roots treated as trusted
    #[serde(default = "default_root_history")]
    pub root_history: usize,
    /// Refuse withdraw / swap when no root source is available
    #[serde(default)]
    pub require_trusted_root: bool,
}

impl Default for MerkleConfig {
    fn default() -> Self {
        Self {
            root_history: DEFAULT_ROOT_HISTORY,
            require_trusted_root: false,
        }
    }
}

fn default_root_history() -> usize {
    DEFAULT_ROOT_HISTORY
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Where overrides are read from; the process environment outside tests
type EnvSource<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Set field from env var if present
fn env_string(env: EnvSource, key: &str, field: &mut String) {
    if let Some(v) = env(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: FromStr>(env: EnvSource, key: &str, field: &mut T) {
    if let Some(v) = env(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: FromStr>(env: EnvSource, key: &str, field: &mut Option<T>) {
    if let Some(v) = env(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(env: EnvSource, key: &str) -> Option<bool> {
    env(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl ShadeConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SHADE_CONFIG env var
        if let Ok(path) = env::var("SHADE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("SHADE_CONFIG points at missing file: {}", path.display());
        }

        // 2. Check ./shade.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shade/shade.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(&|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, env: EnvSource) {
        // Prover
        env_parse(env, "SHADE_PROVER_BACKEND", &mut self.prover.backend);
        env_string(env, "SHADE_ARTIFACTS_DIR", &mut self.prover.artifacts_dir);
        env_parse(env, "SHADE_PROVER_WORKERS", &mut self.prover.workers);
        env_parse_option(
            env,
            "SHADE_PROOF_TIMEOUT_SECS",
            &mut self.prover.proof_timeout_secs,
        );
        if let Some(v) = env_bool(env, "SHADE_VERIFY_LOCALLY") {
            self.prover.verify_locally = v;
        }

        // Store
        env_parse(env, "SHADE_SPENT_POLICY", &mut self.store.spent_policy);
        env_string(env, "SHADE_BACKUP_DIR", &mut self.store.backup_dir);
        env_parse(env, "SHADE_BACKUP_RETENTION", &mut self.store.backup_retention);

        // Hash
        env_parse(env, "SHADE_HASHER", &mut self.hash.hasher);

        // Merkle
        env_parse(env, "SHADE_ROOT_HISTORY", &mut self.merkle.root_history);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.prover.proof_timeout_secs = Some(120);
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
