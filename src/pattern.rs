//! Variant-properties pattern matching (spec §4.6, component C6).

use std::collections::BTreeMap;

use crate::record::VariantProperties;

/// A map from variant-dimension name to an optional concrete value. `None`
/// ("wildcard") matches any value for that name (spec §4.6).
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct VariantPropertiesPattern(BTreeMap<String, Option<String>>);

impl VariantPropertiesPattern {
    pub fn new(entries: BTreeMap<String, Option<String>>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &BTreeMap<String, Option<String>> {
        &self.0
    }

    /// Builds the pattern for an `Entry(depending, more_dimensioned_variants)`
    /// (spec §4.6): start from `depending`'s concrete variant properties,
    /// then widen every name in `more_dimensioned_variants` to a wildcard —
    /// including names already present, which is an intentional widening,
    /// not an error (spec §4.6 edge case).
    pub fn build(depending: &VariantProperties, more_dimensioned_variants: &[String]) -> Self {
        let mut entries: BTreeMap<String, Option<String>> = depending
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        for name in more_dimensioned_variants {
            entries.insert(name.clone(), None);
        }
        Self(entries)
    }

    /// `P.matches(V)` holds iff `V` and `P` share the same name set (same
    /// cardinality, same keys) and every name's value either matches
    /// exactly or is wildcarded (spec §4.6).
    pub fn matches(&self, concrete: &VariantProperties) -> bool {
        if self.0.len() != concrete.len() {
            return false;
        }
        self.0.iter().all(|(name, pattern_value)| {
            concrete
                .get(name)
                .is_some_and(|v| pattern_value.as_deref().is_none_or(|pv| pv == v))
        })
    }
}
