//! Variable scopes
//!
//! A stack of scopes: the bottom is global, each function call pushes one,
//! `local` declarations write the top. Lookup walks the stack top-down;
//! plain assignment targets the nearest existing binding, else the global
//! scope. Unexported variables never reach child processes.

use crate::state::value::{Attributes, Value, Variable};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VarError {
    #[error("{0}: readonly variable")]
    Readonly(String),
    #[error("{0}: not an indexed array")]
    NotIndexed(String),
}

#[derive(Debug, Clone, Default)]
pub struct VarScopes {
    /// `scopes[0]` is global; the last entry is the innermost function.
    scopes: Vec<HashMap<String, Variable>>,
}

impl VarScopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name))
    }

    /// Scalar string view of a variable, `None` when unset.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|v| v.value.as_ref())
            .map(|v| v.as_scalar())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).map_or(false, |v| v.is_set())
    }

    /// Assign in the nearest scope holding the name, else globally.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), VarError> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(var) = scope.get_mut(name) {
                if var.attrs.readonly {
                    return Err(VarError::Readonly(name.to_string()));
                }
                var.value = Some(value);
                return Ok(());
            }
        }
        self.scopes[0].insert(name.to_string(), Variable {
            value: Some(value),
            attrs: Attributes::default(),
        });
        Ok(())
    }

    pub fn set_scalar(&mut self, name: &str, value: impl Into<String>) -> Result<(), VarError> {
        self.set(name, Value::scalar(value))
    }

    /// Create or overwrite a binding in the current (innermost) scope.
    pub fn set_local(&mut self, name: &str, value: Option<Value>) -> Result<(), VarError> {
        let scope = self.scopes.last_mut().unwrap();
        if let Some(var) = scope.get_mut(name) {
            if var.attrs.readonly {
                return Err(VarError::Readonly(name.to_string()));
            }
            if value.is_some() {
                var.value = value;
            }
            return Ok(());
        }
        scope.insert(name.to_string(), Variable {
            value,
            attrs: Attributes::default(),
        });
        Ok(())
    }

    /// Assign one element of an indexed array, growing it as needed.
    /// Assigning an index to a scalar converts it (old value at index 0).
    pub fn set_index(&mut self, name: &str, index: i64, value: String) -> Result<(), VarError> {
        if self.get(name).is_none() {
            self.set(name, Value::Indexed(Vec::new()))?;
        }
        let var = self.get_mut(name).unwrap();
        if var.attrs.readonly {
            return Err(VarError::Readonly(name.to_string()));
        }

        // Scalars convert to arrays with the old value at index 0.
        if matches!(&var.value, Some(Value::Scalar(_)) | None) {
            let first = match var.value.take() {
                Some(Value::Scalar(s)) => vec![Some(s)],
                _ => Vec::new(),
            };
            var.value = Some(Value::Indexed(first));
        }

        let items = match &mut var.value {
            Some(Value::Indexed(items)) => items,
            Some(Value::Assoc(map)) => {
                map.insert(index.to_string(), value);
                return Ok(());
            }
            _ => unreachable!(),
        };

        let index = if index < 0 {
            let adjusted = items.len() as i64 + index;
            if adjusted < 0 {
                return Err(VarError::NotIndexed(name.to_string()));
            }
            adjusted as usize
        } else {
            index as usize
        };
        if index >= items.len() {
            items.resize(index + 1, None);
        }
        items[index] = Some(value);
        Ok(())
    }

    /// Assign one key of an associative array.
    pub fn set_key(&mut self, name: &str, key: &str, value: String) -> Result<(), VarError> {
        if self.get(name).is_none() {
            self.set(name, Value::Assoc(Default::default()))?;
        }
        let var = self.get_mut(name).unwrap();
        if var.attrs.readonly {
            return Err(VarError::Readonly(name.to_string()));
        }
        match &mut var.value {
            Some(Value::Assoc(map)) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            _ => Err(VarError::NotIndexed(name.to_string())),
        }
    }

    /// Remove the nearest binding. Unsetting an unset name succeeds.
    pub fn unset(&mut self, name: &str) -> Result<(), VarError> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(var) = scope.get(name) {
                if var.attrs.readonly {
                    return Err(VarError::Readonly(name.to_string()));
                }
                scope.remove(name);
                return Ok(());
            }
        }
        Ok(())
    }

    pub fn set_attr(&mut self, name: &str, f: impl FnOnce(&mut Attributes)) {
        if let Some(var) = self.get_mut(name) {
            f(&mut var.attrs);
        } else {
            let mut var = Variable::declared();
            f(&mut var.attrs);
            self.scopes[0].insert(name.to_string(), var);
        }
    }

    pub fn export(&mut self, name: &str) {
        self.set_attr(name, |a| a.exported = true);
    }

    pub fn make_readonly(&mut self, name: &str) {
        self.set_attr(name, |a| a.readonly = true);
    }

    /// Environment for child processes: exported, set variables only.
    /// Arrays are not exported, matching bash.
    pub fn environ(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        let mut env = Vec::new();
        for scope in self.scopes.iter().rev() {
            for (name, var) in scope {
                if seen.contains(name) {
                    continue;
                }
                seen.insert(name.clone());
                if !var.attrs.exported {
                    continue;
                }
                match &var.value {
                    Some(Value::Scalar(s)) => env.push((name.clone(), s.clone())),
                    _ => continue,
                }
            }
        }
        env.sort();
        env
    }

    /// Names with the given prefix, for `${!prefix*}`.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .scopes
            .iter()
            .flat_map(|s| s.keys())
            .filter(|n| n.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// All visible variables, innermost binding winning.
    pub fn visible(&self) -> Vec<(String, &Variable)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for scope in self.scopes.iter().rev() {
            for (name, var) in scope {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), var));
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_assignment_and_lookup() {
        let mut vars = VarScopes::new();
        vars.set_scalar("x", "1").unwrap();
        assert_eq!(vars.get_string("x").as_deref(), Some("1"));
        assert!(vars.is_set("x"));
        assert!(!vars.is_set("y"));
    }

    #[test]
    fn local_shadows_global() {
        let mut vars = VarScopes::new();
        vars.set_scalar("v", "out").unwrap();
        vars.push_scope();
        vars.set_local("v", Some(Value::scalar("in"))).unwrap();
        assert_eq!(vars.get_string("v").as_deref(), Some("in"));
        vars.pop_scope();
        assert_eq!(vars.get_string("v").as_deref(), Some("out"));
    }

    #[test]
    fn assignment_without_local_targets_nearest_binding() {
        let mut vars = VarScopes::new();
        vars.set_scalar("v", "global").unwrap();
        vars.push_scope();
        vars.set_scalar("v", "changed").unwrap();
        vars.pop_scope();
        // No local binding existed, so the global was updated.
        assert_eq!(vars.get_string("v").as_deref(), Some("changed"));
    }

    #[test]
    fn assignment_in_function_without_binding_goes_global() {
        let mut vars = VarScopes::new();
        vars.push_scope();
        vars.set_scalar("fresh", "value").unwrap();
        vars.pop_scope();
        assert_eq!(vars.get_string("fresh").as_deref(), Some("value"));
    }

    #[test]
    fn readonly_cannot_be_assigned_or_unset() {
        let mut vars = VarScopes::new();
        vars.set_scalar("ro", "v").unwrap();
        vars.make_readonly("ro");
        assert!(matches!(vars.set_scalar("ro", "w"), Err(VarError::Readonly(_))));
        assert!(matches!(vars.unset("ro"), Err(VarError::Readonly(_))));
        assert_eq!(vars.get_string("ro").as_deref(), Some("v"));
    }

    #[test]
    fn set_then_unset_is_like_never_set() {
        let mut vars = VarScopes::new();
        vars.set_scalar("tmp", "v").unwrap();
        vars.unset("tmp").unwrap();
        assert!(!vars.is_set("tmp"));
        assert!(vars.get("tmp").is_none());
    }

    #[test]
    fn index_assignment_converts_scalar() {
        let mut vars = VarScopes::new();
        vars.set_scalar("a", "first").unwrap();
        vars.set_index("a", 2, "third".into()).unwrap();
        let value = vars.get("a").unwrap().value.as_ref().unwrap();
        assert_eq!(value.elements(), vec!["first", "third"]);
        assert_eq!(value.keys(), vec!["0", "2"]);
    }

    #[test]
    fn environ_only_exports_scalars() {
        let mut vars = VarScopes::new();
        vars.set_scalar("EXPORTED", "yes").unwrap();
        vars.export("EXPORTED");
        vars.set_scalar("HIDDEN", "no").unwrap();
        vars.set("arr", Value::Indexed(vec![Some("a".into())])).unwrap();
        vars.export("arr");

        let env = vars.environ();
        assert!(env.contains(&("EXPORTED".to_string(), "yes".to_string())));
        assert!(!env.iter().any(|(k, _)| k == "HIDDEN"));
        assert!(!env.iter().any(|(k, _)| k == "arr"));
    }

    #[test]
    fn scope_depth_matches_pushes() {
        let mut vars = VarScopes::new();
        assert_eq!(vars.depth(), 0);
        vars.push_scope();
        vars.push_scope();
        assert_eq!(vars.depth(), 2);
        vars.pop_scope();
        assert_eq!(vars.depth(), 1);
        // The global scope can never be popped.
        vars.pop_scope();
        vars.pop_scope();
        assert_eq!(vars.depth(), 0);
    }

    #[test]
    fn names_with_prefix_sorted() {
        let mut vars = VarScopes::new();
        vars.set_scalar("FOO_B", "1").unwrap();
        vars.set_scalar("FOO_A", "2").unwrap();
        vars.set_scalar("BAR", "3").unwrap();
        assert_eq!(vars.names_with_prefix("FOO_"), vec!["FOO_A", "FOO_B"]);
    }
}
