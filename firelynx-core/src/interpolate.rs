//! `${VAR}` / `${VAR:default}` expansion over fields that opt in.
//!
//! Opting in is done by wrapping a field's type in [`Interpolated`] rather
//! than a bare `String` — ids and other non-interpolatable strings stay
//! plain `String` and the walker never touches them. Container impls below
//! let a struct derive its own walk by calling `.interpolate()` on each
//! `Interpolated`/`Option<Interpolated>`/`Vec<Interpolated>` field in turn.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Somewhere to look up a variable by name. Production code uses
/// [`SystemEnv`]; tests supply a plain map.
pub trait EnvLookup {
    fn get(&self, name: &str) -> Option<String>;
}

pub struct SystemEnv;

impl EnvLookup for SystemEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// A missing variable with no default, collected rather than raised so a
/// whole graph can be checked in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpolationIssue {
    pub variable: String,
}

/// A field that opts into `${VAR}` expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interpolated(pub String);

impl Interpolated {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Interpolated {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Interpolated {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Interpolated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Interpolated {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// Implemented by every piece of config that may contain interpolatable
/// fields, recursively.
pub trait Interpolate {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>);
}

impl Interpolate for Interpolated {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        self.0 = expand_str(&self.0, env, errors);
    }
}

impl<T: Interpolate> Interpolate for Option<T> {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        if let Some(inner) = self {
            inner.interpolate(env, errors);
        }
    }
}

impl<T: Interpolate> Interpolate for Vec<T> {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        for item in self.iter_mut() {
            item.interpolate(env, errors);
        }
    }
}

impl<T: Interpolate> Interpolate for HashMap<String, T> {
    fn interpolate(&mut self, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
        for value in self.values_mut() {
            value.interpolate(env, errors);
        }
    }
}

/// Walks an opaque JSON value (an app's or middleware's kind-specific
/// config block) and expands every string it finds. Unlike the typed
/// structs above, these blocks have no statically known field-level opt-in
/// metadata — the whole block is the opt-in unit. Object keys are left
/// untouched; only values are expanded.
pub fn interpolate_json(value: &mut serde_json::Value, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) {
    match value {
        serde_json::Value::String(s) => {
            *s = expand_str(s, env, errors);
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                interpolate_json(item, env, errors);
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values_mut() {
                interpolate_json(v, env, errors);
            }
        }
        serde_json::Value::Number(_) | serde_json::Value::Bool(_) | serde_json::Value::Null => {}
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_ident_continue)
}

/// Expands every `${NAME}` / `${NAME:default}` token in `input`. Unknown
/// tokens without a default are left verbatim and recorded in `errors`.
pub fn expand_str(input: &str, env: &dyn EnvLookup, errors: &mut Vec<InterpolationIssue>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    loop {
        let Some(start) = rest.find("${") else {
            out.push_str(rest);
            break;
        };
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        let body_start = &tail[2..];
        let Some(end) = body_start.find('}') else {
            // No closing brace — not a token, copy the rest verbatim.
            out.push_str(tail);
            break;
        };
        let body = &body_start[..end];
        let (name, default) = match body.find(':') {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };

        if is_valid_ident(name) {
            match env.get(name) {
                Some(value) => out.push_str(&value),
                None => match default {
                    Some(d) => out.push_str(d),
                    None => {
                        errors.push(InterpolationIssue {
                            variable: name.to_string(),
                        });
                        out.push_str(&tail[..2 + end + 1]);
                    }
                },
            }
            rest = &body_start[end + 1..];
        } else {
            // Not a valid identifier — treat `${` as literal and continue past it.
            out.push_str("${");
            rest = &tail[2..];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn expands_known_variable() {
        let mut errors = vec![];
        let out = expand_str("${HOST}:8080", &env(&[("HOST", "example.com")]), &mut errors);
        assert_eq!(out, "example.com:8080");
        assert!(errors.is_empty());
    }

    #[test]
    fn falls_back_to_default_when_unset() {
        let mut errors = vec![];
        let out = expand_str("${HOST:127.0.0.1}:${PORT:8080}", &env(&[("PORT", "9090")]), &mut errors);
        assert_eq!(out, "127.0.0.1:9090");
        assert!(errors.is_empty());
    }

    #[test]
    fn empty_default_expands_to_empty_string() {
        let mut errors = vec![];
        let out = expand_str("prefix-${NAME:}-suffix", &env(&[]), &mut errors);
        assert_eq!(out, "prefix--suffix");
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_variable_with_no_default_is_an_error_and_left_in_place() {
        let mut errors = vec![];
        let out = expand_str("${MISSING}", &env(&[]), &mut errors);
        assert_eq!(out, "${MISSING}");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].variable, "MISSING");
    }

    #[test]
    fn aggregates_every_missing_variable_instead_of_short_circuiting() {
        let mut errors = vec![];
        let _ = expand_str("${A}-${B}-${C}", &env(&[("B", "ok")]), &mut errors);
        let names: Vec<_> = errors.iter().map(|e| e.variable.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn is_idempotent() {
        let e = env(&[("HOST", "example.com")]);
        let mut errors1 = vec![];
        let once = expand_str("${HOST}/x", &e, &mut errors1);
        let mut errors2 = vec![];
        let twice = expand_str(&once, &e, &mut errors2);
        assert_eq!(once, twice);
        assert!(errors2.is_empty());
    }

    #[test]
    fn interpolated_field_walks_via_trait() {
        let mut value = Interpolated::new("${HOST:localhost}");
        let mut errors = vec![];
        value.interpolate(&env(&[]), &mut errors);
        assert_eq!(value.as_str(), "localhost");
    }

    #[test]
    fn vec_and_option_containers_recurse() {
        let mut values = vec![Interpolated::new("${A:x}"), Interpolated::new("${B:y}")];
        let mut errors = vec![];
        values.interpolate(&env(&[]), &mut errors);
        assert_eq!(values[0].as_str(), "x");
        assert_eq!(values[1].as_str(), "y");

        let mut opt: Option<Interpolated> = Some(Interpolated::new("${C:z}"));
        opt.interpolate(&env(&[]), &mut errors);
        assert_eq!(opt.unwrap().as_str(), "z");
    }
}
