//! Variable values and attributes
//!
//! A shell variable holds a scalar string, an indexed array (sparse), or an
//! associative array. Attributes control assignment and child visibility.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    /// Sparse indexed array; `None` entries are unset indices.
    Indexed(Vec<Option<String>>),
    /// Associative array preserving insertion order.
    Assoc(IndexMap<String, String>),
}

impl Value {
    pub fn scalar(s: impl Into<String>) -> Self {
        Value::Scalar(s.into())
    }

    /// The value a scalar reference sees: a scalar itself, or element 0 of
    /// an array.
    pub fn as_scalar(&self) -> String {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Indexed(items) => items
                .first()
                .and_then(|v| v.clone())
                .unwrap_or_default(),
            Value::Assoc(map) => map.get("0").cloned().unwrap_or_default(),
        }
    }

    /// All elements in order, for `${arr[@]}`.
    pub fn elements(&self) -> Vec<String> {
        match self {
            Value::Scalar(s) => vec![s.clone()],
            Value::Indexed(items) => items.iter().flatten().cloned().collect(),
            Value::Assoc(map) => map.values().cloned().collect(),
        }
    }

    /// Keys in order, for `${!arr[@]}`.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Scalar(_) => vec!["0".to_string()],
            Value::Indexed(items) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_some())
                .map(|(i, _)| i.to_string())
                .collect(),
            Value::Assoc(map) => map.keys().cloned().collect(),
        }
    }

    /// Element count, for `${#arr[@]}`.
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Indexed(items) => items.iter().flatten().count(),
            Value::Assoc(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_index(&self, index: i64) -> Option<String> {
        match self {
            Value::Scalar(s) => (index == 0).then(|| s.clone()),
            Value::Indexed(items) => {
                let index = if index < 0 {
                    let len = items.len() as i64;
                    let adjusted = len + index;
                    if adjusted < 0 {
                        return None;
                    }
                    adjusted as usize
                } else {
                    index as usize
                };
                items.get(index).and_then(|v| v.clone())
            }
            Value::Assoc(map) => map.get(&index.to_string()).cloned(),
        }
    }

    pub fn get_key(&self, key: &str) -> Option<String> {
        match self {
            Value::Assoc(map) => map.get(key).cloned(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    pub readonly: bool,
    pub exported: bool,
    /// `declare -i`: values are evaluated arithmetically on assignment.
    pub integer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// `None` means declared without a value (`declare x` / `local x`).
    pub value: Option<Value>,
    pub attrs: Attributes,
}

impl Variable {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            value: Some(Value::scalar(value)),
            attrs: Attributes::default(),
        }
    }

    pub fn declared() -> Self {
        Self {
            value: None,
            attrs: Attributes::default(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_views() {
        let v = Value::scalar("hello");
        assert_eq!(v.as_scalar(), "hello");
        assert_eq!(v.elements(), vec!["hello"]);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn indexed_sparse() {
        let v = Value::Indexed(vec![Some("a".into()), None, Some("c".into())]);
        assert_eq!(v.as_scalar(), "a");
        assert_eq!(v.elements(), vec!["a", "c"]);
        assert_eq!(v.keys(), vec!["0", "2"]);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get_index(2).as_deref(), Some("c"));
        assert_eq!(v.get_index(1), None);
        assert_eq!(v.get_index(-1).as_deref(), Some("c"));
    }

    #[test]
    fn assoc_preserves_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("zebra".to_string(), "1".to_string());
        map.insert("apple".to_string(), "2".to_string());
        let v = Value::Assoc(map);
        assert_eq!(v.keys(), vec!["zebra", "apple"]);
        assert_eq!(v.get_key("apple").as_deref(), Some("2"));
    }
}
