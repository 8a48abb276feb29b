//! Port resolution.
//!
//! `PortResolver` turns an optional user-supplied port name into an open
//! [`DeviceLink`]. The preferred port is tried first; after that the candidate
//! providers are scanned in order and the first port that opens wins.
//!
//! # Scan order
//!
//! ```text
//! preferred (alias-resolved) ─> provider 1 ─> provider 2 ─> ... ─> NoPortAvailable
//! ```
//!
//! With the default providers that is `/dev/ttyUSB0..5`, then `COM0..49`.

pub mod candidates;

pub use candidates::{
    CandidateProvider, CandidateSource, EnumeratedPorts, IndexedDevices, NamedPorts,
};

use crate::config::SerialConfig;
use crate::link::DeviceLink;
use crate::port::{LinkSettings, PortError, PortOpener, SystemPortOpener};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while acquiring a port.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every candidate failed to open.
    #[error("No serial port available ({} candidates tried)", .tried.len())]
    NoPortAvailable { tried: Vec<String> },
}

/// Finds and opens the serial port the probe board is attached to.
pub struct PortResolver {
    opener: Arc<dyn PortOpener>,
    providers: Vec<Box<dyn CandidateProvider>>,
    aliases: HashMap<String, String>,
    settings: LinkSettings,
}

impl PortResolver {
    /// Create a resolver with the default USB/COM scan.
    pub fn new(opener: Arc<dyn PortOpener>, settings: LinkSettings) -> Self {
        let providers = CandidateSource::default_scan()
            .iter()
            .map(CandidateSource::provider)
            .collect();

        Self {
            opener,
            providers,
            aliases: HashMap::new(),
            settings,
        }
    }

    /// Create a resolver for real hardware from the `[serial]` config section.
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(Arc::new(SystemPortOpener), config.link_settings())
            .with_providers(config.candidates.iter().map(CandidateSource::provider).collect())
            .with_aliases(config.port_aliases.clone())
    }

    /// Replace the candidate providers.
    pub fn with_providers(mut self, providers: Vec<Box<dyn CandidateProvider>>) -> Self {
        self.providers = providers;
        self
    }

    /// Map friendly names (e.g. `probe`) to device paths.
    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// The fallback scan order, duplicates removed (first occurrence wins).
    pub fn candidates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.providers
            .iter()
            .flat_map(|p| p.candidates())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Resolve a user-supplied name through the alias table.
    pub fn resolve_alias(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Open the preferred port, or the first candidate that opens.
    ///
    /// Blank names count as "no preference". Each attempt costs at most one
    /// open; there is no overall deadline, no delay between attempts and no
    /// retry once the scan is exhausted.
    pub fn resolve(&self, preferred: Option<&str>) -> Result<DeviceLink, ResolveError> {
        let mut tried = Vec::new();

        if let Some(name) = preferred.map(str::trim).filter(|n| !n.is_empty()) {
            let name = self.resolve_alias(name);
            match self.try_open(&name) {
                Ok(link) => return Ok(link),
                Err(e) => {
                    warn!("Failed to open {}: {}. Falling back to scanning ports.", name, e);
                    tried.push(name);
                }
            }
        }

        for name in self.candidates() {
            match self.try_open(&name) {
                Ok(link) => return Ok(link),
                Err(e) => {
                    debug!("Failed to open {}: {}. Trying the next port.", name, e);
                    tried.push(name);
                }
            }
        }

        warn!("No serial port could be opened after {} attempts", tried.len());
        Err(ResolveError::NoPortAvailable { tried })
    }

    fn try_open(&self, name: &str) -> Result<DeviceLink, PortError> {
        let mut port = self.opener.open(name, &self.settings)?;
        // DTR/RTS are wired to reset on most probe boards.
        port.write_control_lines(false, false)?;

        info!("Serial port {} is open at {} baud", name, self.settings.baud_rate);
        Ok(DeviceLink::new(port))
    }
}

impl std::fmt::Debug for PortResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortResolver")
            .field("providers", &self.providers)
            .field("aliases", &self.aliases)
            .field("settings", &self.settings)
            .finish()
    }
}
