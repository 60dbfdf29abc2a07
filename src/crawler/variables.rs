//! Variable bindings for crawl iterations.
//!
//! A binding maps variable names to ordered candidate-value lists. Insertion
//! order is significant: it fixes enumeration order, and the first value of
//! a list is the one substituted into URL templates.

use std::collections::HashMap;

use serde_json::Value;

/// An insertion-ordered mapping of variable name to candidate values.
///
/// Cloning a binding yields a fully independent copy, so loop-axis mutation
/// of one iteration's binding can never leak into another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBinding {
    order: Vec<String>,
    values: HashMap<String, Vec<Value>>,
}

impl VariableBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidate list for `name`, keeping its insertion slot if
    /// the name already exists.
    pub fn set(&mut self, name: &str, values: Vec<Value>) {
        if !self.values.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.values.insert(name.to_string(), values);
    }

    /// Replace `name` with a single candidate value.
    pub fn set_scalar(&mut self, name: &str, value: Value) {
        self.set(name, vec![value]);
    }

    /// Fold another source's entries into this binding.
    ///
    /// A name that already exists has the new values appended to its list
    /// rather than replacing it; new names append at the end in source order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, Vec<Value>)>) {
        for (name, mut values) in entries {
            match self.values.get_mut(&name) {
                Some(existing) => existing.append(&mut values),
                None => {
                    self.order.push(name.clone());
                    self.values.insert(name, values);
                }
            }
        }
    }

    /// Full candidate list for a name.
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.values.get(name).map(|v| v.as_slice())
    }

    /// First candidate value for a name.
    pub fn scalar(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(|v| v.first())
    }

    /// First candidate rendered as a string, for template substitution.
    ///
    /// Strings render bare (no quotes); other values render as their JSON
    /// form.
    pub fn scalar_str(&self, name: &str) -> Option<String> {
        self.scalar(name).map(render_value)
    }

    /// Variable names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Render a variable value for URL substitution.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cartesian product over candidate lists.
///
/// Yields one `Vec` per combination, rightmost axis varying fastest, in the
/// order the input lists were given. An empty `lists` yields exactly one
/// empty combination; any empty axis yields nothing.
pub fn cartesian_product<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    if lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let mut combos = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(combos.len() * list.len());
        for combo in &combos {
            for item in list {
                let mut extended = combo.clone();
                extended.push(item.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extend_appends_to_existing_names() {
        let mut binding = VariableBinding::new();
        binding.set("ticker", vec![json!("ACME")]);
        binding.extend(vec![("ticker".to_string(), vec![json!("WIDG")])]);

        assert_eq!(
            binding.get("ticker").unwrap(),
            &[json!("ACME"), json!("WIDG")]
        );
        // Still a single slot in the ordering.
        assert_eq!(binding.names().collect::<Vec<_>>(), vec!["ticker"]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut binding = VariableBinding::new();
        binding.set_scalar("url", json!("https://example.com"));
        binding.set_scalar("year", json!(2024));
        binding.extend(vec![("quarter".to_string(), vec![json!("q1")])]);

        assert_eq!(
            binding.names().collect::<Vec<_>>(),
            vec!["url", "year", "quarter"]
        );
    }

    #[test]
    fn scalar_takes_first_candidate() {
        let mut binding = VariableBinding::new();
        binding.set("page", vec![json!(1), json!(2), json!(3)]);
        assert_eq!(binding.scalar("page"), Some(&json!(1)));
        assert_eq!(binding.scalar_str("page").as_deref(), Some("1"));
    }

    #[test]
    fn strings_render_without_quotes() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!(true)), "true");
    }

    #[test]
    fn clones_are_independent() {
        let mut baseline = VariableBinding::new();
        baseline.set("page", vec![json!(1), json!(2)]);

        let mut first = baseline.clone();
        first.set_scalar("page", json!(1));
        let mut second = baseline.clone();
        second.set_scalar("page", json!(2));

        assert_eq!(first.scalar("page"), Some(&json!(1)));
        assert_eq!(second.scalar("page"), Some(&json!(2)));
        assert_eq!(baseline.get("page").unwrap().len(), 2);
    }

    #[test]
    fn product_orders_rightmost_fastest() {
        let combos = cartesian_product(&[vec![1, 2], vec![10, 20]]);
        assert_eq!(
            combos,
            vec![vec![1, 10], vec![1, 20], vec![2, 10], vec![2, 20]]
        );
    }

    #[test]
    fn product_of_nothing_is_one_empty_combo() {
        let combos: Vec<Vec<i32>> = cartesian_product(&[]);
        assert_eq!(combos, vec![Vec::<i32>::new()]);
    }

    #[test]
    fn product_with_empty_axis_is_empty() {
        let combos = cartesian_product(&[vec![1, 2], vec![]]);
        assert!(combos.is_empty());
    }
}
