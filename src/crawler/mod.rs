//! Crawl orchestration.
//!
//! A crawl definition declares input categories, variable references, loop
//! variables, and templated URLs. The orchestrator expands the variable
//! space into concrete bindings and hands each one to a crawl strategy.

pub mod config;
pub mod paths;
pub mod rate_limiter;
pub mod templated_url;
pub mod variables;

mod root;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub use config::{ConfigStore, CrawlConfig, TemplatedUrlConfig, VariableSet};
pub use paths::{path_from_url, sanitize_component};
pub use rate_limiter::{Delay, DomainRateLimiter};
pub use root::RootCrawl;
pub use templated_url::TemplatedUrl;
pub use variables::{cartesian_product, VariableBinding};

use crate::ledger::DieselError;

/// Errors surfaced by crawl orchestration. All are fatal for the current
/// run; there is no retry at this layer.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("missing variable '{name}' in URL template '{template}'")]
    MissingVariable { name: String, template: String },

    #[error("unknown configuration reference '{0}'")]
    UnknownReference(String),

    #[error("invalid crawl configuration '{path}': {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Database(#[from] DieselError),

    #[error(transparent)]
    Fetch(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// How a binding is processed. A closed set: new crawl behaviors are added
/// as new variants, not by open-ended subclassing.
pub enum CrawlStrategy {
    /// Fetch every templated URL and record the outcome in the ledger.
    Root(RootCrawl),
}

impl CrawlStrategy {
    pub async fn process(&mut self, binding: &VariableBinding) -> Result<(), CrawlError> {
        match self {
            CrawlStrategy::Root(root) => root.process(binding).await,
        }
    }
}

/// Expands a crawl definition's variable space into concrete bindings and
/// dispatches each one to a strategy.
pub struct Crawler<'a> {
    store: &'a ConfigStore,
    config: &'a CrawlConfig,
}

impl<'a> Crawler<'a> {
    pub fn new(store: &'a ConfigStore, config: &'a CrawlConfig) -> Self {
        Self { store, config }
    }

    /// Run the strategy over every (input, loop) combination in order.
    pub async fn execute(&self, strategy: &mut CrawlStrategy) -> Result<(), CrawlError> {
        for binding in self.bindings()? {
            strategy.process(&binding).await?;
        }
        Ok(())
    }

    /// Every binding this definition produces, in enumeration order.
    ///
    /// The outer axis is the cartesian product across input categories; the
    /// inner axis is the product over the baseline's loop-variable lists.
    /// Each loop tuple mutates a fresh clone of the baseline, so bindings
    /// are independent of one another.
    pub fn bindings(&self) -> Result<Vec<VariableBinding>, CrawlError> {
        let mut out = Vec::new();
        for combination in self.input_combinations()? {
            let baseline = self.merge_variables(&combination)?;
            for loop_values in self.loop_combinations(&baseline)? {
                let mut binding = baseline.clone();
                for (name, value) in self.config.loop_variables.iter().zip(loop_values) {
                    binding.set_scalar(name, value);
                }
                out.push(binding);
            }
        }
        Ok(out)
    }

    /// Cartesian product across the definition's input categories.
    ///
    /// A category with no variable sets is treated as a configuration
    /// mistake rather than silently producing zero combinations.
    fn input_combinations(&self) -> Result<Vec<Vec<&'a VariableSet>>, CrawlError> {
        let mut axes = Vec::with_capacity(self.config.inputs.len());
        for category in &self.config.inputs {
            let sets = self.store.sets_of_type(category);
            if sets.is_empty() {
                return Err(CrawlError::UnknownReference(category.clone()));
            }
            axes.push(sets);
        }
        Ok(cartesian_product(&axes))
    }

    /// Fold one input combination plus the definition's own variable
    /// references into a baseline binding. Input-axis sets fold first, so
    /// crawl-level declarations extend (and thereby shadow-extend) them.
    fn merge_variables(
        &self,
        combination: &[&VariableSet],
    ) -> Result<VariableBinding, CrawlError> {
        let mut binding = VariableBinding::new();
        for set in combination {
            binding.extend(set.stripped_entries());
        }
        for name in &self.config.variables {
            let set = self.store.variable_set(name)?;
            binding.extend(set.stripped_entries());
        }
        Ok(binding)
    }

    /// Candidate tuples for the loop axis, from the baseline's lists.
    fn loop_combinations(
        &self,
        baseline: &VariableBinding,
    ) -> Result<Vec<Vec<Value>>, CrawlError> {
        let mut lists = Vec::with_capacity(self.config.loop_variables.len());
        for name in &self.config.loop_variables {
            let values = baseline
                .get(name)
                .ok_or_else(|| CrawlError::UnknownReference(name.clone()))?;
            lists.push(values.to_vec());
        }
        Ok(cartesian_product(&lists))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn store_from(dir: &Path, files: &[(&str, &str)]) -> ConfigStore {
        for (name, contents) in files {
            fs::write(dir.join(name), contents).unwrap();
        }
        ConfigStore::load(dir).unwrap()
    }

    #[test]
    fn input_axis_yields_one_binding_per_set() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[
                (
                    "10-one.yaml",
                    "name: one\ntype: site\nparams:\n  a: 1\n",
                ),
                (
                    "20-two.yaml",
                    "name: two\ntype: site\nparams:\n  a: 2\n",
                ),
                (
                    "30-crawl.yaml",
                    "name: sweep\ntype: root-crawl\ninputs: [site]\n",
                ),
            ],
        );

        let config = store.crawl("sweep").unwrap();
        let bindings = Crawler::new(&store, config).bindings().unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].scalar("a"), Some(&json!(1)));
        assert_eq!(bindings[1].scalar("a"), Some(&json!(2)));
    }

    #[test]
    fn loop_axis_overwrites_a_fresh_clone_per_tuple() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[
                (
                    "10-acme.yaml",
                    "name: acme\ntype: company\nparams:\n  url: \"https://example.com\"\n  ticker: [\"ACME\", \"WIDG\"]\n",
                ),
                (
                    "30-crawl.yaml",
                    "name: filings\ntype: root-crawl\ninputs: [company]\nloop_variables: [ticker]\n",
                ),
            ],
        );

        let config = store.crawl("filings").unwrap();
        let bindings = Crawler::new(&store, config).bindings().unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].scalar("ticker"), Some(&json!("ACME")));
        assert_eq!(bindings[1].scalar("ticker"), Some(&json!("WIDG")));
        // Loop-axis mutation narrowed each binding to a single candidate.
        assert_eq!(bindings[0].get("ticker").unwrap().len(), 1);
        assert_eq!(bindings[1].get("ticker").unwrap().len(), 1);
        // And the shared `url` entry survived untouched in both.
        assert_eq!(
            bindings[0].scalar_str("url").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(bindings[0].scalar_str("url"), bindings[1].scalar_str("url"));
    }

    #[test]
    fn crawl_variables_fold_after_input_sets() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[
                (
                    "10-acme.yaml",
                    "name: acme\ntype: company\nparams:\n  url: \"https://example.com\"\n  year: [2023]\n",
                ),
                (
                    "20-window.yaml",
                    "name: window\ntype: shared\nparams:\n  year: [2024]\n",
                ),
                (
                    "30-crawl.yaml",
                    "name: filings\ntype: root-crawl\ninputs: [company]\nvariables: [window]\n",
                ),
            ],
        );

        let config = store.crawl("filings").unwrap();
        let bindings = Crawler::new(&store, config).bindings().unwrap();

        assert_eq!(bindings.len(), 1);
        // Extend semantics: the crawl-level declaration appended its value.
        assert_eq!(
            bindings[0].get("year").unwrap(),
            &[json!(2023), json!(2024)]
        );
    }

    #[test]
    fn two_categories_take_the_cartesian_product() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[
                ("10-a.yaml", "name: a\ntype: left\nparams:\n  l: \"a\"\n"),
                ("11-b.yaml", "name: b\ntype: left\nparams:\n  l: \"b\"\n"),
                ("20-x.yaml", "name: x\ntype: right\nparams:\n  r: \"x\"\n"),
                ("21-y.yaml", "name: y\ntype: right\nparams:\n  r: \"y\"\n"),
                (
                    "30-crawl.yaml",
                    "name: grid\ntype: root-crawl\ninputs: [left, right]\n",
                ),
            ],
        );

        let config = store.crawl("grid").unwrap();
        let bindings = Crawler::new(&store, config).bindings().unwrap();

        let pairs: Vec<(String, String)> = bindings
            .iter()
            .map(|b| {
                (
                    b.scalar_str("l").unwrap(),
                    b.scalar_str("r").unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("a".into(), "x".into()),
                ("a".into(), "y".into()),
                ("b".into(), "x".into()),
                ("b".into(), "y".into()),
            ]
        );
    }

    #[test]
    fn empty_input_category_is_an_error() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[(
                "30-crawl.yaml",
                "name: sweep\ntype: root-crawl\ninputs: [nonexistent]\n",
            )],
        );

        let config = store.crawl("sweep").unwrap();
        let err = Crawler::new(&store, config).bindings().unwrap_err();
        assert!(matches!(err, CrawlError::UnknownReference(name) if name == "nonexistent"));
    }

    #[test]
    fn loop_variable_missing_from_binding_is_an_error() {
        let dir = tempdir().unwrap();
        let store = store_from(
            dir.path(),
            &[
                ("10-a.yaml", "name: a\ntype: site\nparams:\n  a: 1\n"),
                (
                    "30-crawl.yaml",
                    "name: sweep\ntype: root-crawl\ninputs: [site]\nloop_variables: [pages]\n",
                ),
            ],
        );

        let config = store.crawl("sweep").unwrap();
        let err = Crawler::new(&store, config).bindings().unwrap_err();
        assert!(matches!(err, CrawlError::UnknownReference(name) if name == "pages"));
    }
}
