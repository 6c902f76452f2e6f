//! Wire format of the remote `index.json` document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::Build;

/// Product name to product descriptor, exactly as published.
pub type Manifest = BTreeMap<String, ManifestProduct>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub versions: BTreeMap<String, ManifestVersion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasums: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasums_signature: Option<String>,
    #[serde(default)]
    pub builds: Vec<Build>,
}

pub fn parse(bytes: &[u8]) -> Result<Manifest, serde_json::Error> {
    serde_json::from_slice(bytes)
}
