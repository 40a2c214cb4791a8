//! Static configuration loaded at startup.
//! These settings affect server binding or pipeline limits and require a
//! restart to change.

use serde::Deserialize;
use std::time::Duration;

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_processing")]
    pub processing: ProcessingConfig,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            processing: default_processing(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body cap for the upload route.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Pipeline limits
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Documents per merged output in batch mode.
    #[serde(default = "default_merge_batch_size")]
    pub merge_batch_size: usize,

    /// At or below this many documents the upload is returned unmerged.
    #[serde(default = "default_single_pass_limit")]
    pub single_pass_limit: usize,

    /// Word count above which a merged part is flagged in its filename.
    #[serde(default = "default_word_count_warning")]
    pub word_count_warning: usize,

    /// Seconds a progress subscriber waits for an event before closing.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl ProcessingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        default_processing()
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        max_upload_bytes: default_max_upload_bytes(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

pub(crate) fn default_processing() -> ProcessingConfig {
    ProcessingConfig {
        merge_batch_size: default_merge_batch_size(),
        single_pass_limit: default_single_pass_limit(),
        word_count_warning: default_word_count_warning(),
        idle_timeout_secs: default_idle_timeout_secs(),
    }
}

pub(crate) fn default_merge_batch_size() -> usize {
    50
}

pub(crate) fn default_single_pass_limit() -> usize {
    50
}

pub(crate) fn default_word_count_warning() -> usize {
    50_000
}

pub(crate) fn default_idle_timeout_secs() -> u64 {
    5
}
