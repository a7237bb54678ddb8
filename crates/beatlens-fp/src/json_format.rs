//! JSON snapshot format
//!
//! Human-readable alternative to the binary format, convenient for small
//! catalogs and for inspecting what was indexed.

use crate::error::Result;
use crate::format::IndexSnapshot;
use std::path::Path;

impl IndexSnapshot {
    /// Save to JSON file
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_json(path: &Path) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let snapshot: IndexSnapshot = serde_json::from_str(&json_str)?;
        Ok(snapshot)
    }
}
