//! URL templates resolved against variable bindings.

use super::config::TemplatedUrlConfig;
use super::variables::VariableBinding;
use super::CrawlError;

/// A crawl-declared URL pattern with `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct TemplatedUrl {
    pub name: String,
    pub template: String,
    /// When true, the ledger is consulted and a prior download suppresses
    /// the fetch.
    pub cache: bool,
}

impl From<&TemplatedUrlConfig> for TemplatedUrl {
    fn from(config: &TemplatedUrlConfig) -> Self {
        Self {
            name: config.name.clone(),
            template: config.url.clone(),
            cache: config.cache,
        }
    }
}

impl TemplatedUrl {
    /// Resolve against a binding: the binding's `url` value is the required
    /// base, followed by the template with placeholders substituted.
    pub fn resolve(&self, binding: &VariableBinding) -> Result<String, CrawlError> {
        let base = binding
            .scalar_str("url")
            .ok_or_else(|| CrawlError::MissingVariable {
                name: "url".to_string(),
                template: self.template.clone(),
            })?;
        let rendered = render_template(&self.template, binding)?;
        Ok(format!("{}{}", base, rendered))
    }
}

/// Substitute every `{name}` placeholder with the binding's first value for
/// that name. `{{` and `}}` escape to literal braces. A placeholder naming a
/// variable absent from the binding is an error.
pub fn render_template(template: &str, binding: &VariableBinding) -> Result<String, CrawlError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(CrawlError::MissingVariable {
                                name,
                                template: template.to_string(),
                            })
                        }
                    }
                }
                let value =
                    binding
                        .scalar_str(&name)
                        .ok_or_else(|| CrawlError::MissingVariable {
                            name: name.clone(),
                            template: template.to_string(),
                        })?;
                out.push_str(&value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
