//! `{key}` template substitution over a resolved Parameter Set.
//!
//! Format-string semantics: `{key}` is replaced by the stringified value,
//! `{{` and `}}` are literal braces. A key absent from the parameter set is
//! a hard error for the repository being processed, never a silent skip.

use super::EngineError;
use indexmap::IndexMap;
use serde_json::Value;

/// Substitute every template in order with the same parameter set.
pub fn substitute_all(
    templates: &[String],
    params: &IndexMap<String, Value>,
) -> Result<Vec<String>, EngineError> {
    templates.iter().map(|t| substitute(t, params)).collect()
}

pub fn substitute(template: &str, params: &IndexMap<String, Value>) -> Result<String, EngineError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(EngineError::MalformedTemplate(template.to_string()))
                        }
                        Some(c) => key.push(c),
                        None => return Err(EngineError::MalformedTemplate(template.to_string())),
                    }
                }
                match params.get(&key) {
                    Some(value) => out.push_str(&display_value(value)),
                    None => {
                        return Err(EngineError::MissingParameter {
                            key,
                            template: template.to_string(),
                        })
                    }
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(EngineError::MalformedTemplate(template.to_string()));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Strings render verbatim; every other value renders as its JSON form.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_basic_substitution() {
        let p = params(&[
            ("url", Value::String("https://example.com/a.git".to_string())),
            ("path", Value::String("core/a".to_string())),
        ]);
        assert_eq!(
            substitute("git clone {url} {path}", &p).unwrap(),
            "git clone https://example.com/a.git core/a"
        );
    }

    #[test]
    fn test_non_string_values() {
        let p = params(&[
            ("is_metarepo", Value::Bool(false)),
            ("count", Value::Number(3.into())),
        ]);
        assert_eq!(
            substitute("echo {is_metarepo} {count}", &p).unwrap(),
            "echo false 3"
        );
    }

    #[test]
    fn test_literal_braces() {
        let p = params(&[("name", Value::String("a".to_string()))]);
        assert_eq!(
            substitute("awk '{{print $1}}' {name}.txt", &p).unwrap(),
            "awk '{print $1}' a.txt"
        );
    }

    #[test]
    fn test_missing_parameter_is_hard_error() {
        let p = params(&[]);
        let err = substitute("git checkout {BRANCH}", &p).unwrap_err();
        match err {
            EngineError::MissingParameter { key, template } => {
                assert_eq!(key, "BRANCH");
                assert_eq!(template, "git checkout {BRANCH}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_templates() {
        let p = params(&[("a", Value::String("x".to_string()))]);
        assert!(matches!(
            substitute("unclosed {a", &p),
            Err(EngineError::MalformedTemplate(_))
        ));
        assert!(matches!(
            substitute("stray } brace", &p),
            Err(EngineError::MalformedTemplate(_))
        ));
        assert!(matches!(
            substitute("nested {a{b}}", &p),
            Err(EngineError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_substitute_all_order_and_shared_params() {
        let p = params(&[("name", Value::String("repo".to_string()))]);
        let templates = vec!["git fetch {name}".to_string(), "git pull {name}".to_string()];
        assert_eq!(
            substitute_all(&templates, &p).unwrap(),
            vec!["git fetch repo", "git pull repo"]
        );
    }

    #[test]
    fn test_substitute_all_fails_fast() {
        let p = params(&[]);
        let templates = vec!["echo ok".to_string(), "echo {missing}".to_string()];
        assert!(substitute_all(&templates, &p).is_err());
    }
}
