//! Value-type compatibility and implicit conversions.
//!
//! Two value types are compatible when they are equal or when the pair is
//! listed in the [`ConversionTable`]. Pairs are symmetric: allowing
//! `Number -> Boolean` also allows `Boolean -> Number`. The table is plain
//! data so embedders can extend it through [`GraphConfig`](crate::config::GraphConfig).
//!
//! Default table:
//! - Number <-> Boolean

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::ValueType;

/// Symmetric set of implicitly convertible value-type pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(ValueType, ValueType)>", into = "Vec<(ValueType, ValueType)>")]
pub struct ConversionTable {
    /// Each pair is stored once, smaller type first.
    pairs: BTreeSet<(ValueType, ValueType)>,
}

impl ConversionTable {
    /// A table with no implicit conversions: only identical types connect.
    pub fn empty() -> Self {
        ConversionTable {
            pairs: BTreeSet::new(),
        }
    }

    /// Allows implicit conversion between `a` and `b` in both directions.
    pub fn allow(&mut self, a: ValueType, b: ValueType) -> &mut Self {
        if a != b {
            self.pairs.insert(Self::key(a, b));
        }
        self
    }

    /// Returns `true` if a value of type `a` can flow into a point of type `b`.
    pub fn compatible(&self, a: &ValueType, b: &ValueType) -> bool {
        if a == b {
            return true;
        }
        self.pairs.contains(&Self::key(a.clone(), b.clone()))
    }

    /// Iterates the configured pairs, smaller type first.
    pub fn pairs(&self) -> impl Iterator<Item = &(ValueType, ValueType)> {
        self.pairs.iter()
    }

    fn key(a: ValueType, b: ValueType) -> (ValueType, ValueType) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        let mut table = ConversionTable::empty();
        table.allow(ValueType::Number, ValueType::Boolean);
        table
    }
}

impl From<Vec<(ValueType, ValueType)>> for ConversionTable {
    fn from(pairs: Vec<(ValueType, ValueType)>) -> Self {
        let mut table = ConversionTable::empty();
        for (a, b) in pairs {
            table.allow(a, b);
        }
        table
    }
}

impl From<ConversionTable> for Vec<(ValueType, ValueType)> {
    fn from(table: ConversionTable) -> Self {
        table.pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_value_type() -> impl Strategy<Value = ValueType> {
        prop_oneof![
            Just(ValueType::Number),
            Just(ValueType::Boolean),
            Just(ValueType::String),
            Just(ValueType::Array),
            Just(ValueType::Object),
            Just(ValueType::Vec2),
            Just(ValueType::Vec3),
            Just(ValueType::Vec4),
            "[A-Z][a-z]{1,8}".prop_map(ValueType::from),
        ]
    }

    #[test]
    fn number_and_boolean_convert_both_ways() {
        let table = ConversionTable::default();
        assert!(table.compatible(&ValueType::Number, &ValueType::Boolean));
        assert!(table.compatible(&ValueType::Boolean, &ValueType::Number));
    }

    #[test]
    fn unrelated_types_are_incompatible() {
        let table = ConversionTable::default();
        assert!(!table.compatible(&ValueType::Number, &ValueType::Array));
        assert!(!table.compatible(&ValueType::String, &ValueType::Vec3));
    }

    #[test]
    fn empty_table_only_allows_identity() {
        let table = ConversionTable::empty();
        assert!(table.compatible(&ValueType::Vec2, &ValueType::Vec2));
        assert!(!table.compatible(&ValueType::Number, &ValueType::Boolean));
    }

    #[test]
    fn table_is_extensible() {
        let mut table = ConversionTable::default();
        table.allow(ValueType::Class("Entity".into()), ValueType::Object);
        assert!(table.compatible(&ValueType::Object, &ValueType::from("Entity")));
    }

    #[test]
    fn table_serializes_as_pair_list() {
        let json = serde_json::to_string(&ConversionTable::default()).unwrap();
        assert_eq!(json, "[[\"Number\",\"Boolean\"]]");
        let back: ConversionTable = serde_json::from_str("[[\"Vec3\", \"Array\"]]").unwrap();
        assert!(back.compatible(&ValueType::Array, &ValueType::Vec3));
        assert!(!back.compatible(&ValueType::Number, &ValueType::Boolean));
    }

    proptest! {
        #[test]
        fn compatibility_is_reflexive(ty in any_value_type()) {
            prop_assert!(ConversionTable::default().compatible(&ty, &ty));
        }

        #[test]
        fn compatibility_is_symmetric(a in any_value_type(), b in any_value_type()) {
            let table = ConversionTable::default();
            prop_assert_eq!(table.compatible(&a, &b), table.compatible(&b, &a));
        }
    }
}
