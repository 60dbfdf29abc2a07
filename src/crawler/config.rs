//! Crawl configuration store.
//!
//! A configs directory holds one YAML entry per file. An entry is either a
//! variable set (its `type` names an input category) or a crawl definition
//! (`type: root-crawl`). Files load in sorted filename order so enumeration
//! is stable across runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use super::CrawlError;

/// The `type` tag marking a crawl definition rather than a variable set.
pub const ROOT_CRAWL_TYPE: &str = "root-crawl";

/// Param value marking "use the default"; stripped before folding so the
/// marker never reaches a binding.
const DEFAULT_MARKER: &str = "default";

/// A templated URL declared on a crawl definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplatedUrlConfig {
    pub name: String,
    /// Template string, resolved against the binding and prefixed with the
    /// binding's `url` value.
    pub url: String,
    /// Consult the ledger before fetching when true.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_cache() -> bool {
    true
}

/// Raw YAML shape shared by both entry kinds.
#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: serde_yaml::Mapping,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    variables: Vec<String>,
    #[serde(default)]
    loop_variables: Vec<String>,
    #[serde(default)]
    urls: Vec<TemplatedUrlConfig>,
}

/// A named set of variable values contributed by one config entry.
#[derive(Debug, Clone)]
pub struct VariableSet {
    pub name: String,
    /// Input category this set belongs to.
    pub kind: String,
    /// Params in file order.
    params: Vec<(String, Value)>,
    pub path: PathBuf,
}

impl VariableSet {
    /// Entries normalized to candidate lists, with default markers stripped.
    ///
    /// A YAML list value contributes its elements as candidates; any other
    /// value is a single candidate.
    pub fn stripped_entries(&self) -> Vec<(String, Vec<Value>)> {
        self.params
            .iter()
            .filter(|(_, value)| !is_default_marker(value))
            .map(|(name, value)| {
                let candidates = match value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                (name.clone(), candidates)
            })
            .collect()
    }
}

fn is_default_marker(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == DEFAULT_MARKER)
}

/// A crawl definition: what to enumerate and which URLs to fetch.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub name: String,
    /// Input categories enumerated on the outer axis.
    pub inputs: Vec<String>,
    /// Names of variable sets folded in after the input axis.
    pub variables: Vec<String>,
    /// Names whose candidate lists drive the inner loop axis.
    pub loop_variables: Vec<String>,
    pub urls: Vec<TemplatedUrlConfig>,
    /// File the definition was loaded from, recorded on every version row.
    pub path: PathBuf,
}

/// All configuration entries under one directory.
pub struct ConfigStore {
    sets: Vec<VariableSet>,
    by_name: HashMap<String, usize>,
    crawls: Vec<CrawlConfig>,
}

impl ConfigStore {
    /// Load every `*.yaml`/`*.yml` file directly under `dir`.
    pub fn load(dir: &Path) -> Result<Self, CrawlError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        let mut store = Self {
            sets: Vec::new(),
            by_name: HashMap::new(),
            crawls: Vec::new(),
        };
        for path in paths {
            store.load_file(&path)?;
        }
        Ok(store)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), CrawlError> {
        let text = fs::read_to_string(path)?;
        let raw: RawEntry =
            serde_yaml::from_str(&text).map_err(|source| CrawlError::InvalidConfig {
                path: path.to_path_buf(),
                source,
            })?;

        if raw.kind == ROOT_CRAWL_TYPE {
            self.crawls.push(CrawlConfig {
                name: raw.name,
                inputs: raw.inputs,
                variables: raw.variables,
                loop_variables: raw.loop_variables,
                urls: raw.urls,
                path: path.to_path_buf(),
            });
        } else {
            let params = raw
                .params
                .into_iter()
                .map(|(key, value)| {
                    let key = key
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            serde_yaml::to_string(&key)
                                .map(|s| s.trim_end().to_string())
                                .unwrap_or_default()
                        });
                    let value = serde_json::to_value(value).unwrap_or(Value::Null);
                    (key, value)
                })
                .collect();
            let index = self.sets.len();
            self.by_name.insert(raw.name.clone(), index);
            self.sets.push(VariableSet {
                name: raw.name,
                kind: raw.kind,
                params,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Look up a variable set by name.
    pub fn variable_set(&self, name: &str) -> Result<&VariableSet, CrawlError> {
        self.by_name
            .get(name)
            .map(|&i| &self.sets[i])
            .ok_or_else(|| CrawlError::UnknownReference(name.to_string()))
    }

    /// Every variable set declared with the given category type, in load order.
    pub fn sets_of_type(&self, kind: &str) -> Vec<&VariableSet> {
        self.sets.iter().filter(|s| s.kind == kind).collect()
    }

    /// Look up a crawl definition by name.
    pub fn crawl(&self, name: &str) -> Result<&CrawlConfig, CrawlError> {
        self.crawls
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CrawlError::UnknownReference(name.to_string()))
    }

    /// Every crawl definition, in load order.
    pub fn crawls(&self) -> &[CrawlConfig] {
        &self.crawls
    }
}
