//! Error types for shmupfetch
//!
//! This module defines the error types for every stage of the fetch-and-reconcile
//! pipeline. Per-entry errors (parse failures, missing parts, incomplete downloads)
//! are designed to be recorded and skipped by the batch layer; only configuration
//! and listing exhaustion surface directly to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while parsing a single catalog page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageParseError {
    /// CSS selector could not be compiled
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// Required element missing from the page
    #[error("Expected element not found: {selector}")]
    ElementNotFound { selector: String },

    /// Detail page lists no downloadable parts
    #[error("No download links found on detail page")]
    NoDownloads,

    /// A `data-size` attribute did not hold a byte count
    #[error("Invalid part size '{value}' for {part}")]
    InvalidSize { part: String, value: String },

    /// A `data-role` attribute held an unknown role
    #[error("Unknown part role '{value}' for {part}")]
    InvalidRole { part: String, value: String },

    /// A link could not be turned into an absolute URL
    #[error("Invalid URL discovered: {url}")]
    InvalidUrl { url: String },
}

/// Remote catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Listing page could not be fetched after all retries
    #[error("Remote catalog unavailable at {url} after {attempts} attempts: {reason}")]
    RemoteUnavailable {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Developer name not present in configuration
    #[error("Unknown developer: {name}. Available: {available}")]
    UnknownDeveloper { name: String, available: String },

    /// Detail page could not be parsed
    #[error("Malformed detail page for {identifier}: {source}")]
    MalformedDetail {
        identifier: String,
        #[source]
        source: PageParseError,
    },

    /// Listing page could not be parsed
    #[error("Malformed listing page {url}: {source}")]
    MalformedListing {
        url: String,
        #[source]
        source: PageParseError,
    },

    /// A catalogued part did not answer its liveness probe
    #[error("Part {part} of {identifier} is not live: {reason}")]
    PartUnavailable {
        identifier: String,
        part: String,
        reason: String,
    },

    /// Configured base URL or manufacturer path is not a valid URL
    #[error("Invalid catalog URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

/// Download and HTTP transport errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempt exceeded its timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Remote resource does not exist
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Access to the resource was refused
    #[error("Access forbidden: {url}")]
    Forbidden { url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Part resolution produced nothing to download
    #[error("No downloadable parts found for {identifier}")]
    NoPartsFound { identifier: String },

    /// Resolved parts do not form a valid plan
    #[error("Invalid download plan for {identifier}: {reason}")]
    InvalidPlan { identifier: String, reason: String },

    /// A part exhausted its retries
    #[error("Download of {identifier} incomplete: part {part} failed after {attempts} attempts ({reason})")]
    DownloadIncomplete {
        identifier: String,
        part: String,
        attempts: u32,
        reason: String,
    },

    /// A part kept the wrong size after the verification pass
    #[error("Integrity mismatch for {identifier}: part {part} expected {expected} bytes, got {actual} bytes")]
    IntegrityMismatch {
        identifier: String,
        part: String,
        expected: u64,
        actual: u64,
    },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },
}

impl DownloadError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(e) => !e.is_builder(),
            DownloadError::Timeout { .. }
            | DownloadError::RateLimitExceeded
            | DownloadError::ServerOverloaded
            | DownloadError::Io(_) => true,
            DownloadError::ServerError { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Catalog store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error reading or writing the store file
    #[error("Catalog store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store file could not be decoded
    #[error("Catalog store corrupted at {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Entry could not be encoded
    #[error("Catalog store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Local inventory scan errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// Directory missing or unreadable
    #[error("ROM directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// I/O error while walking the directory
    #[error("I/O error scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format in {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading or writing configuration
    #[error("Configuration I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Default configuration could not be rendered
    #[error("Failed to render default configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Catalog store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Inventory scan error
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(e) => e.is_transient(),
            AppError::Catalog(CatalogError::RemoteUnavailable { .. }) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Catalog(_) => "catalog",
            AppError::Download(_) => "download",
            AppError::Store(_) => "store",
            AppError::Scan(_) => "scan",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Page parsing result type alias
pub type ParseResult<T> = std::result::Result<T, PageParseError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Scan result type alias
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
