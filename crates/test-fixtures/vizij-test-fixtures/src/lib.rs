use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: HashMap<String, SceneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SceneEntry {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        #[allow(dead_code)]
        description: Option<String>,
    },
}

impl SceneEntry {
    fn as_path(&self) -> &str {
        match self {
            SceneEntry::Path(path) => path,
            SceneEntry::Detailed { path, .. } => path,
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_bytes(rel: &str) -> Result<Vec<u8>> {
    let path = resolve_path(rel);
    fs::read(&path).with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.scenes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Raw file bytes. Some scenes are deliberately not valid JSON.
    pub fn bytes(name: &str) -> Result<Vec<u8>> {
        let entry = lookup(&MANIFEST.scenes, "scene", name)?;
        read_bytes(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let raw = bytes(name)?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse JSON fixture {name}"))
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.scenes, "scene", name)?;
        Ok(resolve_path(entry.as_path()))
    }

    /// `file://` URL for the scene, for exercising URL sources.
    pub fn url(name: &str) -> Result<String> {
        let path = path(name)?;
        Ok(format!("file://{}", path.display()))
    }
}
