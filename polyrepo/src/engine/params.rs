//! Parameter Set construction.
//!
//! Builds the flat substitution map for one repository: the repository's own
//! fields (with one pass of environment expansion over string values), the
//! project constants, and the environment snapshot. Precedence is
//! repo field < constant < environment. Resolution itself never fails;
//! a template referencing an absent key fails later, in `template`.

use indexmap::IndexMap;
use polyrepo_core::RepoRecord;
use serde_json::Value;

/// Environment variables captured once at process start. Keys are
/// upper-cased and prefixed with `$`, so `SHELL=/bin/zsh` is addressable
/// from templates as `{$SHELL}`.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: IndexMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (format!("${}", k.to_uppercase()), v))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    /// One best-effort pass of `{name}` substitution against the snapshot.
    /// Placeholders naming unknown keys, and any brace that does not form a
    /// placeholder, pass through untouched.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let key = &after[..close];
                    match self.vars.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    return out;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Build the complete Parameter Set for one repository.
///
/// `python_literal` additionally stores a Python-literal rendering of the
/// whole repository collection under `__repos__`, with this repository's
/// entry replaced by its env-expanded fields.
pub fn resolve(
    name: &str,
    record: &RepoRecord,
    all_repos: &IndexMap<String, RepoRecord>,
    constants: &IndexMap<String, Value>,
    env: &EnvSnapshot,
    python_literal: bool,
) -> IndexMap<String, Value> {
    let mut params: IndexMap<String, Value> = IndexMap::new();

    let expanded = expanded_fields(name, record, env);
    for (key, value) in &expanded {
        params.insert(key.to_string(), value.clone());
    }

    if python_literal {
        let literal = repos_literal(name, &expanded, all_repos);
        params.insert("__repos__".to_string(), Value::String(literal));
    }

    for (key, value) in constants {
        params.insert(key.clone(), value.clone());
    }

    for (key, value) in env.iter() {
        params.insert(key.clone(), Value::String(value.clone()));
    }

    params
}

/// Repository fields with one pass of env expansion applied to the
/// string-valued ones.
fn expanded_fields(name: &str, record: &RepoRecord, env: &EnvSnapshot) -> Vec<(&'static str, Value)> {
    vec![
        ("name", Value::String(env.expand(name))),
        (
            "url",
            match &record.url {
                Some(url) => Value::String(env.expand(url)),
                None => Value::Null,
            },
        ),
        ("path", Value::String(env.expand(&record.path))),
        (
            "tags",
            Value::Array(
                record
                    .tags
                    .iter()
                    .map(|t| Value::String(env.expand(t)))
                    .collect(),
            ),
        ),
        ("is_metarepo", Value::Bool(record.is_metarepo)),
        ("vcs", Value::String(env.expand(&record.vcs))),
    ]
}

fn raw_fields(name: &str, record: &RepoRecord) -> Vec<(&'static str, Value)> {
    vec![
        ("name", Value::String(name.to_string())),
        (
            "url",
            record
                .url
                .as_ref()
                .map(|u| Value::String(u.clone()))
                .unwrap_or(Value::Null),
        ),
        ("path", Value::String(record.path.clone())),
        (
            "tags",
            Value::Array(record.tags.iter().map(|t| Value::String(t.clone())).collect()),
        ),
        ("is_metarepo", Value::Bool(record.is_metarepo)),
        ("vcs", Value::String(record.vcs.clone())),
    ]
}

/// Serialize the repository collection as a Python literal: JSON-shaped
/// syntax with `True`/`False`/`None` spellings. Token rewriting happens
/// structurally, never inside string contents.
fn repos_literal(
    current: &str,
    current_fields: &[(&'static str, Value)],
    all_repos: &IndexMap<String, RepoRecord>,
) -> String {
    let mut out = String::from("{");
    for (i, (name, record)) in all_repos.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_literal(&Value::String(name.clone()), &mut out);
        out.push_str(": ");

        let fields;
        let entry = if name == current {
            current_fields
        } else {
            fields = raw_fields(name, record);
            fields.as_slice()
        };

        out.push('{');
        for (j, (key, value)) in entry.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            push_literal(&Value::String(key.to_string()), &mut out);
            out.push_str(": ");
            push_literal(value, &mut out);
        }
        out.push('}');
    }
    out.push('}');
    out
}

fn push_literal(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => out.push_str(&n.to_string()),
        // serde_json's string rendering gives us escaping compatible with
        // Python's double-quoted string syntax.
        Value::String(s) => out.push_str(&serde_json::to_string(s).unwrap_or_default()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_literal(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_literal(&Value::String(key.clone()), out);
                out.push_str(": ");
                push_literal(item, out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(vars: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_vars(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    fn one_repo() -> (IndexMap<String, RepoRecord>, RepoRecord) {
        let record = RepoRecord::new(
            Some("https://example.com/genisys.git".to_string()),
            "core/genisys",
        );
        let mut repos = IndexMap::new();
        repos.insert("genisys".to_string(), record.clone());
        (repos, record)
    }

    #[test]
    fn test_env_snapshot_key_normalization() {
        let env = snapshot(&[("branch", "main")]);
        assert_eq!(env.get("$BRANCH"), Some(&"main".to_string()));
        assert_eq!(env.get("branch"), None);
    }

    #[test]
    fn test_expand_replaces_known_keys() {
        let env = snapshot(&[("BRANCH", "release/1.2")]);
        assert_eq!(env.expand("origin/{$BRANCH}"), "origin/release/1.2");
    }

    #[test]
    fn test_expand_leaves_unknown_placeholders() {
        let env = snapshot(&[]);
        assert_eq!(env.expand("git checkout {BRANCH}"), "git checkout {BRANCH}");
        assert_eq!(env.expand("dangling {brace"), "dangling {brace");
    }

    #[test]
    fn test_resolve_contains_repo_fields() {
        let (repos, record) = one_repo();
        let params = resolve(
            "genisys",
            &record,
            &repos,
            &IndexMap::new(),
            &EnvSnapshot::default(),
            false,
        );

        assert_eq!(params.get("name"), Some(&Value::String("genisys".to_string())));
        assert_eq!(params.get("path"), Some(&Value::String("core/genisys".to_string())));
        assert_eq!(
            params.get("url"),
            Some(&Value::String("https://example.com/genisys.git".to_string()))
        );
        assert_eq!(params.get("vcs"), Some(&Value::String("git".to_string())));
        assert!(params.get("__repos__").is_none());
    }

    #[test]
    fn test_repo_string_fields_env_expanded() {
        let (repos, mut record) = one_repo();
        record.path = "checkouts/{$TIER}/genisys".to_string();
        let env = snapshot(&[("TIER", "prod")]);

        let params = resolve("genisys", &record, &repos, &IndexMap::new(), &env, false);
        assert_eq!(
            params.get("path"),
            Some(&Value::String("checkouts/prod/genisys".to_string()))
        );
    }

    #[test]
    fn test_precedence_repo_below_constants_below_env() {
        let (repos, record) = one_repo();
        let mut constants = IndexMap::new();
        // Shadows the repo field
        constants.insert("path".to_string(), Value::String("from-constants".to_string()));
        constants.insert("$BRANCH".to_string(), Value::String("hello".to_string()));
        let env = snapshot(&[("BRANCH", "world")]);

        let params = resolve("genisys", &record, &repos, &constants, &env, false);

        assert_eq!(params.get("path"), Some(&Value::String("from-constants".to_string())));
        assert_eq!(params.get("$BRANCH"), Some(&Value::String("world".to_string())));
    }

    #[test]
    fn test_python_literal_repos() {
        let (mut repos, _) = one_repo();
        let mut bare = RepoRecord::metarepo();
        bare.tags = vec!["root".to_string()];
        repos.insert("metarepo".to_string(), bare.clone());

        let record = repos.get("genisys").unwrap().clone();
        let params = resolve(
            "genisys",
            &record,
            &repos,
            &IndexMap::new(),
            &EnvSnapshot::default(),
            true,
        );

        let literal = match params.get("__repos__") {
            Some(Value::String(s)) => s.clone(),
            other => panic!("expected string literal, got {:?}", other),
        };

        // Python spellings, not JSON ones
        assert!(literal.contains("\"is_metarepo\": False"), "{}", literal);
        assert!(literal.contains("\"is_metarepo\": True"), "{}", literal);
        assert!(literal.contains("\"url\": None"), "{}", literal);
        assert!(literal.contains("\"tags\": [\"root\"]"), "{}", literal);
        // Collection order follows the repos table
        assert!(literal.find("genisys").unwrap() < literal.find("metarepo").unwrap());
    }

    #[test]
    fn test_python_literal_tokens_not_rewritten_inside_strings() {
        let mut repos = IndexMap::new();
        let record = RepoRecord::new(Some("https://true.example/null".to_string()), "true/false");
        repos.insert("tricky".to_string(), record.clone());

        let params = resolve(
            "tricky",
            &record,
            &repos,
            &IndexMap::new(),
            &EnvSnapshot::default(),
            true,
        );
        let literal = match params.get("__repos__") {
            Some(Value::String(s)) => s.clone(),
            other => panic!("expected string literal, got {:?}", other),
        };

        assert!(literal.contains("\"https://true.example/null\""), "{}", literal);
        assert!(literal.contains("\"true/false\""), "{}", literal);
    }
}
