//! Fixed-point `{placeholder}` expansion for destination path templates.
//!
//! Templates reference variables by name (`{install_root}/hfs{iso_version}`),
//! and variable values may themselves be templates (`houdini_dir` is usually
//! `{install_root}/hfs{iso_version}`). Expansion substitutes every known
//! placeholder per pass and repeats until a pass changes nothing.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unresolved variable '{{{name}}}' in template '{template}'")]
    UnresolvedVariable { template: String, name: String },
    #[error("cyclic variable expansion in template '{template}'")]
    CyclicExpansion { template: String },
}

/// Append-only variable bag.
///
/// [`Vars::with`] returns a new bag in which the binding shadows any earlier
/// value for the same key; the receiver is left untouched, so a bag that has
/// been handed to the expander never changes underneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    entries: BTreeMap<String, String>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(key.into(), value.into());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A `{name}` occurrence: byte range of the whole placeholder plus the name.
struct Placeholder<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn scan(template: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some(open) = template[offset..].find('{') {
        let start = offset + open;
        let rest = &template[start + 1..];
        match rest.find(|c: char| !is_name_char(c)) {
            Some(len) if len > 0 && rest[len..].starts_with('}') => {
                found.push(Placeholder {
                    start,
                    end: start + len + 2,
                    name: &rest[..len],
                });
                offset = start + len + 2;
            }
            _ => offset = start + 1,
        }
    }
    found
}

/// Names referenced by `{name}` placeholders in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    scan(template).into_iter().map(|p| p.name).collect()
}

fn substitute(template: &str, vars: &Vars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for p in scan(template) {
        if let Some(value) = vars.get(p.name) {
            out.push_str(&template[last..p.start]);
            out.push_str(value);
            last = p.end;
        }
    }
    out.push_str(&template[last..]);
    out
}

/// Expand every `{name}` in `template` against `vars` until a fixed point.
///
/// The number of passes is bounded by `vars.len() + 1`: a chain of nested
/// references can never be deeper than the number of distinct variables.
pub fn expand(template: &str, vars: &Vars) -> Result<String, TemplateError> {
    let max_passes = vars.len() + 1;
    let mut current = template.to_owned();

    for _ in 0..max_passes {
        let next = substitute(&current, vars);
        if next == current {
            return finish(template, next, vars);
        }
        current = next;
    }

    Err(TemplateError::CyclicExpansion {
        template: template.to_owned(),
    })
}

fn finish(template: &str, expanded: String, vars: &Vars) -> Result<String, TemplateError> {
    let remaining = scan(&expanded);
    if let Some(unknown) = remaining.iter().find(|p| !vars.contains(p.name)) {
        return Err(TemplateError::UnresolvedVariable {
            template: template.to_owned(),
            name: unknown.name.to_owned(),
        });
    }
    if remaining.is_empty() {
        Ok(expanded)
    } else {
        // A known placeholder survived a full pass: it expands to itself.
        Err(TemplateError::CyclicExpansion {
            template: template.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        pairs.iter().copied().collect()
    }

    #[test]
    fn expands_nested_references() {
        let v = vars(&[("a", "{c}"), ("c", "X"), ("b", "Y")]);
        assert_eq!(expand("{a}/{b}", &v).unwrap(), "X/Y");
    }

    #[test]
    fn self_reference_is_cyclic() {
        let v = vars(&[("a", "{a}")]);
        assert_eq!(
            expand("{a}", &v),
            Err(TemplateError::CyclicExpansion {
                template: "{a}".to_owned()
            })
        );
    }

    #[test]
    fn mutual_reference_is_cyclic() {
        let v = vars(&[("a", "{b}"), ("b", "{a}")]);
        assert!(matches!(
            expand("/opt/{a}", &v),
            Err(TemplateError::CyclicExpansion { .. })
        ));
    }

    #[test]
    fn growing_reference_is_cyclic() {
        let v = vars(&[("a", "x{a}")]);
        assert!(matches!(
            expand("{a}", &v),
            Err(TemplateError::CyclicExpansion { .. })
        ));
    }

    #[test]
    fn unknown_variable_is_reported_by_name() {
        let v = vars(&[("install_root", "/opt")]);
        let err = expand("{install_root}/hfs{iso_version}", &v).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnresolvedVariable {
                template: "{install_root}/hfs{iso_version}".to_owned(),
                name: "iso_version".to_owned(),
            }
        );
        assert!(err.to_string().contains("{iso_version}"));
    }

    #[test]
    fn default_linux_layout_expands() {
        let v = vars(&[
            ("install_root", "/opt"),
            ("houdini_dir", "{install_root}/hfs{iso_version}"),
            ("engine_maya_dir", "{houdini_dir}/engine/maya"),
            ("iso_version", "20.5.278"),
        ]);
        assert_eq!(
            expand("{engine_maya_dir}", &v).unwrap(),
            "/opt/hfs20.5.278/engine/maya"
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let v = vars(&[
            ("install_root", "C:/Program Files/Side Effects Software"),
            ("houdini_dir", "{install_root}/Houdini {iso_version}"),
            ("iso_version", "20.5.278"),
        ]);
        let once = expand("{houdini_dir}", &v).unwrap();
        assert_eq!(expand(&once, &v).unwrap(), once);
    }

    #[test]
    fn literal_braces_are_left_alone() {
        let v = vars(&[("x", "1")]);
        assert_eq!(expand("{} {not a var} {x}", &v).unwrap(), "{} {not a var} 1");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!(expand("/opt/sidefx", &Vars::new()).unwrap(), "/opt/sidefx");
    }

    #[test]
    fn placeholders_lists_names_in_order() {
        assert_eq!(
            placeholders("{install_root}/hfs{iso_version}/{x y}"),
            vec!["install_root", "iso_version"]
        );
    }

    #[test]
    fn with_does_not_mutate_receiver() {
        let base = vars(&[("iso_version", "19.5")]);
        let bound = base.with("iso_version", "20.0");
        assert_eq!(base.get("iso_version"), Some("19.5"));
        assert_eq!(bound.get("iso_version"), Some("20.0"));
        assert_eq!(bound.len(), 1);
    }

    /// A chain `v0 -> {v1}<lit0>`, `v1 -> {v2}<lit1>`, ... ending in a literal.
    /// Every variable is defined and nothing refers back, so the chain is the
    /// deepest acyclic nesting a bag of this size allows.
    fn chain_strategy() -> impl Strategy<Value = (Vars, String)> {
        prop::collection::vec("[a-z0-9 /._-]{0,6}", 1..10).prop_map(|literals| {
            let n = literals.len();
            let mut bag = Vars::new();
            let mut expected = String::new();
            for (i, lit) in literals.iter().enumerate().rev() {
                let value = if i + 1 == n {
                    lit.clone()
                } else {
                    format!("{{v{}}}{lit}", i + 1)
                };
                bag = bag.with(format!("v{i}"), value);
                expected.push_str(lit);
            }
            (bag, expected)
        })
    }

    proptest! {
        #[test]
        fn acyclic_chain_expands_within_pass_bound((bag, expected) in chain_strategy()) {
            prop_assert_eq!(expand("{v0}", &bag), Ok(expected));
        }

        #[test]
        fn expansion_is_idempotent_for_acyclic_bags(
            (bag, _) in chain_strategy(),
            prefix in "[a-z/ ]{0,8}",
            pick in 0usize..10,
        ) {
            let name = format!("v{}", pick % bag.len());
            let template = format!("{prefix}{{{name}}}/x");
            let once = expand(&template, &bag).unwrap();
            prop_assert_eq!(expand(&once, &bag), Ok(once.clone()));
        }

        #[test]
        fn closed_chain_is_cyclic((bag, _) in chain_strategy()) {
            let n = bag.len();
            let closed = bag.with(format!("v{}", n - 1), "{v0}");
            prop_assert!(
                matches!(expand("{v0}", &closed), Err(TemplateError::CyclicExpansion { .. })),
                "closed chain of {} must be cyclic",
                n
            );
        }
    }
}
