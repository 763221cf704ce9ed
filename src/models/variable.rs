//! Variable placeholder syntax
//!
//! Scalar placeholders are written `${name}`. Assignment targets may carry a
//! trailing `=` (`${rc}=`), and formal parameters may carry a default value
//! (`${count}=1`).

/// Inner name of a scalar placeholder, e.g. `rc` for `${rc}`
pub fn scalar_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("${")?.strip_suffix('}')?;
    if inner.trim().is_empty() || inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Whether `text` is exactly one scalar placeholder
pub fn is_scalar(text: &str) -> bool {
    scalar_name(text).is_some()
}

/// Normalize an assignment target, dropping the optional trailing `=`
pub fn assignment_target(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let trimmed = trimmed.strip_suffix('=').unwrap_or(trimmed).trim_end();
    is_scalar(trimmed).then(|| trimmed.to_string())
}

/// Split a parameter declaration into its placeholder and optional default
pub fn split_parameter(text: &str) -> (&str, Option<&str>) {
    match text.find("}=") {
        Some(idx) => (&text[..=idx], Some(&text[idx + 2..])),
        None => (text, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_name() {
        assert_eq!(scalar_name("${rc}"), Some("rc"));
        assert_eq!(scalar_name("${SUITE NAME}"), Some("SUITE NAME"));
        assert_eq!(scalar_name("${}"), None);
        assert_eq!(scalar_name("rc"), None);
        assert_eq!(scalar_name("${a}b"), None);
        assert_eq!(scalar_name("${a{b}"), None);
    }

    #[test]
    fn test_assignment_target() {
        assert_eq!(assignment_target("${rc}"), Some("${rc}".to_string()));
        assert_eq!(assignment_target("${rc}="), Some("${rc}".to_string()));
        assert_eq!(assignment_target("${rc} ="), Some("${rc}".to_string()));
        assert_eq!(assignment_target("rc="), None);
    }

    #[test]
    fn test_split_parameter() {
        assert_eq!(split_parameter("${ip}"), ("${ip}", None));
        assert_eq!(split_parameter("${count}=1"), ("${count}", Some("1")));
        assert_eq!(split_parameter("${empty}="), ("${empty}", Some("")));
    }
}
