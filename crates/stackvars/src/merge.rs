//! Merging variables from several sources into one [CompilationSet]
//!
//! Sources are folded in precedence order. For every variable:
//! - not seen before: inserted
//! - both the existing and the new value are maps: keys of both are kept, the new value wins for
//!   keys present in both (one level only, map values are scalars)
//! - otherwise: the new value replaces the existing one
//!
//! The same rule applies between schema defaults, definition files and command line overrides,
//! precedence is only a matter of the order the sources are fed in.
use crate::value::{Name, Value, Variables};

/// All variables of one compilation run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CompilationSet {
    variables: Variables,
}

impl CompilationSet {
    /// Folds `layers` in order, later layers take precedence
    pub fn fold(layers: impl IntoIterator<Item = Variables>) -> Self {
        let mut set = Self::default();
        for layer in layers {
            set.merge_all(layer);
        }
        set
    }

    pub fn merge_all(&mut self, variables: Variables) {
        for (name, value) in variables {
            self.merge(name, value);
        }
    }

    pub fn merge(&mut self, name: Name, value: Value) {
        let Some(existing) = self.variables.get_mut(&name) else {
            tracing::debug!(%name, kind = %value.kind(), "adding variable");
            self.variables.insert(name, value);
            return;
        };

        match (existing, value) {
            (Value::Map(existing), Value::Map(new)) => {
                for (key, field) in new {
                    tracing::trace!(%name, %key, ?field, "merged map field");
                    existing.insert(key, field);
                }
                tracing::debug!(%name, "merged maps");
            }
            (existing, value) => {
                tracing::debug!(%name, from = ?existing, to = ?value, "overriding variable");
                *existing = value;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables ordered by name
    pub fn sorted(&self) -> impl Iterator<Item = (&Name, &Value)> {
        let mut variables: Vec<_> = self.variables.iter().collect();
        variables.sort_by(|(a, _), (b, _)| a.cmp(b));
        variables.into_iter()
    }
}

impl serde::ser::Serialize for CompilationSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.sorted())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::{Map, Scalar};
    use pretty_assertions::assert_eq;

    fn name(name: &str) -> Name {
        Name::new(name).expect("valid name")
    }

    fn layer(entries: Vec<(&str, Value)>) -> Variables {
        entries
            .into_iter()
            .map(|(key, value)| (name(key), value))
            .collect()
    }

    fn map(entries: &[(&str, &str)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), Scalar::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn later_layer_wins_for_scalars() {
        let set = CompilationSet::fold([
            layer(vec![("region", "a".into()), ("replicas", 1.0.into())]),
            layer(vec![("region", "b".into())]),
        ]);

        assert_eq!(set.get("region"), Some(&Value::from("b")));
        assert_eq!(set.get("replicas"), Some(&Value::from(1.0)));
    }

    #[test]
    fn maps_merge_shallowly() {
        let set = CompilationSet::fold([
            layer(vec![("tags", map(&[("team", "core"), ("env", "x")]))]),
            layer(vec![("tags", map(&[("env", "prod"), ("owner", "ops")]))]),
        ]);

        assert_eq!(
            set.get("tags"),
            Some(&map(&[("team", "core"), ("env", "prod"), ("owner", "ops")]))
        );
    }

    #[test]
    fn non_map_replaces_map_and_vice_versa() {
        let set = CompilationSet::fold([
            layer(vec![("a", map(&[("k", "v")])), ("b", "scalar".into())]),
            layer(vec![("a", "scalar".into()), ("b", map(&[("k", "v")]))]),
        ]);

        assert_eq!(set.get("a"), Some(&Value::from("scalar")));
        assert_eq!(set.get("b"), Some(&map(&[("k", "v")])));
    }

    #[test]
    fn empty_map_keeps_existing_keys() {
        let set = CompilationSet::fold([
            layer(vec![("tags", map(&[("team", "core")]))]),
            layer(vec![("tags", Value::Map(Map::new()))]),
        ]);

        assert_eq!(set.get("tags"), Some(&map(&[("team", "core")])));
    }

    #[test]
    fn sorted_by_name() {
        let set = CompilationSet::fold([layer(vec![
            ("zeta", true.into()),
            ("alpha", true.into()),
            ("Beta", true.into()),
            ("alpha_2", true.into()),
        ])]);

        let names: Vec<_> = set.sorted().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Beta", "alpha", "alpha_2", "zeta"]);
    }
}
