//! Variable scopes
//!
//! Each test body and each user keyword call gets its own scope. Built-in
//! variables are visible everywhere; locals never leak between scopes.

use std::collections::HashMap;

use crate::keywords::{normalize_name, KeywordError, ReturnValue};
use crate::models::variable;

/// Variables visible to one body
#[derive(Clone, Debug)]
pub struct VariableScope {
    suite_name: String,
    test_name: Option<String>,
    locals: HashMap<String, String>,
}

impl VariableScope {
    pub fn new(suite_name: impl Into<String>, test_name: Option<&str>) -> Self {
        Self {
            suite_name: suite_name.into(),
            test_name: test_name.map(str::to_string),
            locals: HashMap::new(),
        }
    }

    /// Fresh scope for a user keyword call; only built-ins carry over
    pub fn child(&self) -> Self {
        Self::new(self.suite_name.clone(), self.test_name.as_deref())
    }

    /// Bind `variable` (written `${name}`) to `value`
    pub fn set(&mut self, variable: &str, value: impl Into<String>) -> Result<(), KeywordError> {
        let name = variable::scalar_name(variable)
            .ok_or_else(|| KeywordError::Assignment(format!("Invalid variable name '{variable}'.")))?;
        self.locals.insert(normalize_name(name), value.into());
        Ok(())
    }

    /// Value of the variable whose inner name is `name`
    pub fn get(&self, name: &str) -> Option<String> {
        let normalized = normalize_name(name);
        if let Some(value) = self.locals.get(&normalized) {
            return Some(value.clone());
        }

        let builtin = match normalized.as_str() {
            "empty" => Some(String::new()),
            "space" => Some(" ".to_string()),
            "true" => Some("True".to_string()),
            "false" => Some("False".to_string()),
            "none" => Some("None".to_string()),
            "suitename" => Some(self.suite_name.clone()),
            "testname" => self.test_name.clone(),
            _ => None,
        };

        builtin.or_else(|| name.trim().parse::<i64>().ok().map(|n| n.to_string()))
    }

    /// Replace every `${name}` in `text`; `\${` yields a literal `${`
    pub fn replace(&self, text: &str) -> Result<String, KeywordError> {
        let mut output = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find("${") {
            if rest[..pos].ends_with('\\') {
                output.push_str(&rest[..pos - 1]);
                output.push_str("${");
                rest = &rest[pos + 2..];
                continue;
            }

            output.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];
            let Some(end) = after.find('}') else {
                output.push_str(&rest[pos..]);
                rest = "";
                break;
            };

            let inner = &after[..end];
            let value = self
                .get(inner)
                .ok_or_else(|| KeywordError::VariableNotFound(format!("${{{inner}}}")))?;
            output.push_str(&value);
            rest = &after[end + 1..];
        }

        output.push_str(rest);
        Ok(output)
    }

    /// Bind a keyword's return value to assignment targets
    pub fn assign(&mut self, targets: &[String], value: ReturnValue) -> Result<(), KeywordError> {
        match (targets, value) {
            ([], _) => Ok(()),
            ([target], value) => self.set(target, value.to_string()),
            (targets, ReturnValue::Multiple(values)) if values.len() == targets.len() => {
                for (target, value) in targets.iter().zip(values) {
                    self.set(target, value)?;
                }
                Ok(())
            }
            (targets, value) => {
                let got = match value {
                    ReturnValue::None => 0,
                    ReturnValue::Scalar(_) => 1,
                    ReturnValue::Multiple(values) => values.len(),
                };
                Err(KeywordError::Assignment(format!(
                    "Expected {} return values, got {got}.",
                    targets.len()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> VariableScope {
        VariableScope::new("Connectivity", Some("Testing DNS Servers"))
    }

    #[test]
    fn test_replace_bound_variables() {
        let mut scope = scope();
        scope.set("${ip}", "8.8.8.8").unwrap();
        assert_eq!(
            scope.replace("ping ${ip} -c 1 -W 5").unwrap(),
            "ping 8.8.8.8 -c 1 -W 5"
        );
        assert_eq!(scope.replace("${IP}${ip}").unwrap(), "8.8.8.88.8.8.8");
    }

    #[test]
    fn test_unbound_variable_fails() {
        let scope = scope();
        assert_eq!(
            scope.replace("ping ${host}").unwrap_err(),
            KeywordError::VariableNotFound("${host}".to_string())
        );
    }

    #[test]
    fn test_builtin_variables() {
        let scope = scope();
        assert_eq!(scope.replace("${SUITE NAME}").unwrap(), "Connectivity");
        assert_eq!(scope.replace("${TEST_NAME}").unwrap(), "Testing DNS Servers");
        assert_eq!(scope.replace("[${EMPTY}]").unwrap(), "[]");
        assert_eq!(scope.replace("${0}").unwrap(), "0");
        assert_eq!(scope.replace("${-1}").unwrap(), "-1");

        let no_test = VariableScope::new("Suite", None);
        assert!(no_test.replace("${TEST NAME}").is_err());
    }

    #[test]
    fn test_escaped_and_unterminated() {
        let scope = scope();
        assert_eq!(scope.replace("\\${ip}").unwrap(), "${ip}");
        assert_eq!(scope.replace("cost ${").unwrap(), "cost ${");
        assert_eq!(scope.replace("no variables").unwrap(), "no variables");
    }

    #[test]
    fn test_child_scope_does_not_inherit_locals() {
        let mut parent = scope();
        parent.set("${rc}", "0").unwrap();
        let child = parent.child();
        assert!(child.get("rc").is_none());
        assert_eq!(child.get("SUITE NAME").as_deref(), Some("Connectivity"));
    }

    #[test]
    fn test_assign() {
        let mut scope = scope();
        scope
            .assign(&["${rc}".to_string()], ReturnValue::Scalar("0".into()))
            .unwrap();
        assert_eq!(scope.get("rc").as_deref(), Some("0"));

        let targets = vec!["${rc}".to_string(), "${output}".to_string()];
        scope
            .assign(
                &targets,
                ReturnValue::Multiple(vec!["1".into(), "unreachable".into()]),
            )
            .unwrap();
        assert_eq!(scope.get("output").as_deref(), Some("unreachable"));

        let err = scope
            .assign(&targets, ReturnValue::Scalar("1".into()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot set variables: Expected 2 return values, got 1."
        );

        scope
            .assign(&["${all}".to_string()], ReturnValue::Multiple(vec!["a".into()]))
            .unwrap();
        assert_eq!(scope.get("all").as_deref(), Some("['a']"));
    }
}
