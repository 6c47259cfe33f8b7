use std::collections::HashMap;

use super::condition::Condition;
use crate::value::Value;

/// Allocates `#n{i}` name and `:c{i}` value placeholders for one request.
///
/// Names are deduplicated, so an attribute referenced by both the key
/// condition and the filter shares a placeholder. Values never are.
#[derive(Debug, Default)]
pub struct Placeholders {
    names: HashMap<String, String>,
    name_lookup: HashMap<String, String>,
    values: HashMap<String, Value>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for an attribute name.
    pub fn name(&mut self, attribute: &str) -> String {
        if let Some(existing) = self.name_lookup.get(attribute) {
            return existing.clone();
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names.insert(placeholder.clone(), attribute.to_string());
        self.name_lookup
            .insert(attribute.to_string(), placeholder.clone());
        placeholder
    }

    /// Placeholder for a value.
    pub fn value(&mut self, value: &Value) -> String {
        let placeholder = format!(":c{}", self.values.len());
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    /// Renders a condition into expression text, registering its placeholders.
    pub fn render(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Compare { name, op, value } => {
                format!("{} {} {}", self.name(name), op.symbol(), self.value(value))
            }
            Condition::Between { name, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.name(name),
                self.value(low),
                self.value(high)
            ),
            Condition::BeginsWith { name, prefix } => {
                format!("begins_with({}, {})", self.name(name), self.value(prefix))
            }
            Condition::Contains { name, value } => {
                format!("contains({}, {})", self.name(name), self.value(value))
            }
            Condition::In { name, values } => {
                let name = self.name(name);
                let values: Vec<String> = values.iter().map(|v| self.value(v)).collect();
                format!("{} IN ({})", name, values.join(", "))
            }
            Condition::Exists(name) => format!("attribute_exists({})", self.name(name)),
            Condition::NotExists(name) => format!("attribute_not_exists({})", self.name(name)),
            Condition::And(a, b) => format!(
                "{} AND {}",
                self.render_operand(a, condition),
                self.render_operand(b, condition)
            ),
            Condition::Or(a, b) => format!(
                "{} OR {}",
                self.render_operand(a, condition),
                self.render_operand(b, condition)
            ),
            Condition::Not(inner) => format!("NOT ({})", self.render(inner)),
        }
    }

    // Mixed AND/OR nesting is parenthesized.
    fn render_operand(&mut self, operand: &Condition, parent: &Condition) -> String {
        let rendered = self.render(operand);
        let same_kind = matches!(
            (operand, parent),
            (Condition::And(..), Condition::And(..)) | (Condition::Or(..), Condition::Or(..))
        );
        match operand {
            Condition::And(..) | Condition::Or(..) if !same_kind => format!("({})", rendered),
            _ => rendered,
        }
    }

    /// Placeholder maps, keyed by placeholder.
    pub fn into_parts(self) -> (HashMap<String, String>, HashMap<String, Value>) {
        (self.names, self.values)
    }
}

/// Key condition and filter rendered against one shared placeholder set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedCondition {
    pub key_condition: Option<String>,
    pub filter: Option<String>,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, Value>,
}

impl RenderedCondition {
    pub fn render(key_condition: Option<&Condition>, filter: Option<&Condition>) -> Self {
        let mut placeholders = Placeholders::new();
        let key_condition = key_condition.map(|c| placeholders.render(c));
        let filter = filter.map(|c| placeholders.render(c));
        let (names, values) = placeholders.into_parts();

        Self {
            key_condition,
            filter,
            names,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{attr, key};

    #[test]
    fn test_render_key_condition() {
        let rendered = RenderedCondition::render(
            Some(&(key("id").eq("1") & key("ts").gt(500000))),
            None,
        );

        assert_eq!(
            rendered.key_condition.as_deref(),
            Some("#n0 = :c0 AND #n1 > :c1")
        );
        assert_eq!(rendered.names.get("#n0").map(String::as_str), Some("id"));
        assert_eq!(rendered.names.get("#n1").map(String::as_str), Some("ts"));
        assert_eq!(rendered.values.get(":c1"), Some(&Value::from(500000)));
        assert_eq!(rendered.filter, None);
    }

    #[test]
    fn test_render_shares_names_across_key_and_filter() {
        let rendered = RenderedCondition::render(
            Some(&key("age").eq(823)),
            Some(&(attr("hair").eq("white") & attr("age").exists())),
        );

        assert_eq!(rendered.key_condition.as_deref(), Some("#n0 = :c0"));
        assert_eq!(
            rendered.filter.as_deref(),
            Some("#n1 = :c1 AND attribute_exists(#n0)")
        );
        assert_eq!(rendered.names.len(), 2);
    }

    #[test]
    fn test_render_functions() {
        let mut placeholders = Placeholders::new();
        assert_eq!(
            placeholders.render(&key("ts").between(1, 2)),
            "#n0 BETWEEN :c0 AND :c1"
        );
        assert_eq!(
            placeholders.render(&key("name").begins_with("Ja")),
            "begins_with(#n1, :c2)"
        );
        assert_eq!(
            placeholders.render(&attr("hair").is_in(["a", "b"])),
            "#n2 IN (:c3, :c4)"
        );
        assert_eq!(
            placeholders.render(&attr("nickname").not_exists()),
            "attribute_not_exists(#n3)"
        );
    }

    #[test]
    fn test_render_parenthesizes_mixed_nesting() {
        let mut placeholders = Placeholders::new();
        let condition = attr("a").eq(1) & (attr("b").eq(2) | attr("c").eq(3));
        assert_eq!(
            placeholders.render(&condition),
            "#n0 = :c0 AND (#n1 = :c1 OR #n2 = :c2)"
        );
        assert_eq!(
            placeholders.render(&!attr("a").eq(1)),
            "NOT (#n0 = :c3)"
        );
    }
}
