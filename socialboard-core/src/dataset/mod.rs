//! Data sets: a dimension collection plus the aggregation tree nested in
//! that collection's order.
//!
//! ## Usage
//!
//! ```rust
//! use socialboard_core::dataset::DataSet;
//! use socialboard_core::dimension::{Dimension, DimensionCollection};
//! use serde_json::json;
//!
//! let gender = Dimension::new("fb.author.gender");
//! let age = Dimension::new("fb.author.age");
//! let dims = DimensionCollection::from_dimensions([gender.clone(), age.clone()]).unwrap();
//!
//! let data = json!({
//!     "measure:interactions": {
//!         "%VALUE%": 40, "%REDACTED%": false,
//!         "dimension:fb.author.gender": {
//!             "male": {
//!                 "%VALUE%": 40, "%REDACTED%": false,
//!                 "dimension:fb.author.age": {"18-24": {"%VALUE%": 40, "%REDACTED%": false}}
//!             }
//!         }
//!     }
//! });
//! let dataset = DataSet::from_value(dims, &data).unwrap();
//!
//! let by_age = DimensionCollection::from_dimensions([age, gender]).unwrap();
//! let pivoted = dataset.pivot(&by_age, false).unwrap();
//! assert_eq!(pivoted.simple(Some("interactions")).unwrap()["18-24:male"], 40);
//! ```

mod pivot;
mod simple;
pub mod tree;

pub use tree::{Breakdown, Count, Measure, Node, Tree};

use crate::analysis::Analysis;
use crate::dimension::{Dimension, DimensionCollection};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Aggregation tree together with the dimensions it is nested by.
///
/// A data set is never modified after construction; [`DataSet::pivot`]
/// returns a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    dimensions: DimensionCollection,
    data: Tree,
}

impl DataSet {
    /// Create a data set, checking that `data` nests in the order of `dimensions`.
    ///
    /// Breakdowns without members are removed.
    pub fn new(dimensions: DimensionCollection, mut data: Tree) -> Result<Self> {
        for node in data.measures.values_mut() {
            node.prune_empty();
            pivot::check_nesting(node, &dimensions, 0)?;
        }
        Ok(Self { dimensions, data })
    }

    /// Create a data set from the wire form of an aggregation result.
    pub fn from_value(dimensions: DimensionCollection, data: &Value) -> Result<Self> {
        Self::new(dimensions, Tree::from_value(data)?)
    }

    /// Create a data set from a raw aggregation response body.
    pub fn from_json(dimensions: DimensionCollection, body: &str) -> Result<Self> {
        Self::new(dimensions, Tree::from_json(body)?)
    }

    /// Create a data set from a populated analysis chain.
    ///
    /// The chain fixes the nesting order of the raw results, so the data set's
    /// dimensions follow the chain. Metadata is taken from `dimensions` when a
    /// target is found there.
    pub fn from_analysis(head: &Analysis, dimensions: &DimensionCollection) -> Result<Self> {
        let results = head.results().ok_or_else(|| {
            Error::InvalidArgument(format!("analysis of {} has no results yet", head.target()))
        })?;

        let chain = DimensionCollection::from_dimensions(head.chain().map(|analysis| {
            dimensions
                .get(analysis.target())
                .cloned()
                .unwrap_or_else(|| Dimension::new(analysis.target()))
        }))?;

        tracing::debug!(
            dimensions = ?chain.targets(),
            "Building data set from analysis chain"
        );
        Self::from_value(chain, results)
    }

    pub fn dimensions(&self) -> &DimensionCollection {
        &self.dimensions
    }

    pub fn data(&self) -> &Tree {
        &self.data
    }

    /// The data tree in wire form.
    pub fn to_value(&self) -> Value {
        self.data.to_value()
    }

    /// Reorder the data into the order of `target`.
    ///
    /// Without `allow_subset`, `target` must hold exactly this data set's
    /// dimensions. With it, one collection must be a subset of the other:
    /// extra dimensions in `target` are ignored, and dimensions missing from
    /// `target` are dropped together with the counts below them. The result
    /// keeps the shared dimensions in `target`'s order.
    pub fn pivot(&self, target: &DimensionCollection, allow_subset: bool) -> Result<DataSet> {
        let dimensions = if allow_subset {
            if self.dimensions.is_subset(target) {
                self.dimensions.ordered_subset(target)?
            } else if target.is_subset(&self.dimensions) {
                self.dimensions.restricted_to(target)
            } else {
                return Err(Error::IncompatibleDimensions(format!(
                    "[{}] and [{}] are not subsets of one another",
                    self.dimensions.targets().join(", "),
                    target.targets().join(", ")
                )));
            }
        } else if self.dimensions.is_same(target) {
            target.clone()
        } else {
            return Err(Error::IncompatibleDimensions(format!(
                "[{}] does not match [{}]",
                self.dimensions.targets().join(", "),
                target.targets().join(", ")
            )));
        };

        let data = pivot::reorder(&self.data, &dimensions)?;

        tracing::debug!(
            from = ?self.dimensions.targets(),
            to = ?dimensions.targets(),
            "Pivoted data set"
        );

        Ok(DataSet { dimensions, data })
    }

    /// Whether `other` can be used where this data set's dimensions are
    /// expected: a subset check when `permissive`, set equality otherwise.
    pub fn is_compatible(&self, other: &DataSet, permissive: bool) -> bool {
        if permissive {
            self.dimensions.is_subset(&other.dimensions)
        } else {
            self.dimensions.is_same(&other.dimensions)
        }
    }

    /// Strip the tree down to bare leaf values.
    ///
    /// `measure` restricts the view to `interactions` or `unique_authors`;
    /// any other name is rejected.
    pub fn simple(&self, measure: Option<&str>) -> Result<BTreeMap<String, u64>> {
        let measure = measure.map(str::parse::<Measure>).transpose()?;
        Ok(simple::simplify(&self.data, measure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dims(targets: &[&str]) -> DimensionCollection {
        DimensionCollection::from_dimensions(targets.iter().map(|t| Dimension::new(*t))).unwrap()
    }

    fn leaf(value: u64) -> Value {
        json!({"%VALUE%": value, "%REDACTED%": false})
    }

    fn gender_age() -> DataSet {
        let data = json!({
            "measure:interactions": {
                "%VALUE%": 100, "%REDACTED%": false,
                "dimension:gender": {
                    "male": {
                        "%VALUE%": 40, "%REDACTED%": false,
                        "dimension:age": {"18-24": leaf(40)}
                    },
                    "female": {
                        "%VALUE%": 60, "%REDACTED%": false,
                        "dimension:age": {"18-24": leaf(60)}
                    }
                }
            }
        });
        DataSet::from_value(dims(&["gender", "age"]), &data).unwrap()
    }

    #[test]
    fn test_pivot_transposes_tree() {
        let dataset = gender_age();
        let pivoted = dataset.pivot(&dims(&["age", "gender"]), false).unwrap();

        assert_eq!(pivoted.dimensions().targets(), vec!["age", "gender"]);

        let root = pivoted.data().measure(Measure::Interactions).unwrap();
        assert_eq!(root.breakdowns[0].target, "age");
        let male = root
            .descend([("age", "18-24"), ("gender", "male")])
            .unwrap();
        let female = root
            .descend([("age", "18-24"), ("gender", "female")])
            .unwrap();
        assert_eq!(male.count, Some(Count::new(40)));
        assert_eq!(female.count, Some(Count::new(60)));
    }

    #[test]
    fn test_pivot_does_not_mutate_source() {
        let dataset = gender_age();
        let before = dataset.clone();
        let _ = dataset.pivot(&dims(&["age", "gender"]), false).unwrap();
        assert_eq!(dataset, before);
    }

    #[test]
    fn test_pivot_rejects_different_dimensions() {
        let dataset = gender_age();
        let err = dataset.pivot(&dims(&["age", "region"]), false).unwrap_err();
        assert!(matches!(err, Error::IncompatibleDimensions(_)));

        let err = dataset.pivot(&dims(&["age", "region"]), true).unwrap_err();
        assert!(matches!(err, Error::IncompatibleDimensions(_)));
    }

    #[test]
    fn test_pivot_ignores_extra_requested_dimensions() {
        let dataset = gender_age();
        let pivoted = dataset
            .pivot(&dims(&["region", "age", "language", "gender"]), true)
            .unwrap();

        assert_eq!(pivoted.dimensions().targets(), vec!["age", "gender"]);
        assert_eq!(
            pivoted,
            dataset.pivot(&dims(&["age", "gender"]), false).unwrap()
        );
    }

    #[test]
    fn test_pivot_drops_trailing_dimension() {
        let dataset = gender_age();
        let reduced = dataset.pivot(&dims(&["gender"]), true).unwrap();

        assert_eq!(reduced.dimensions().targets(), vec!["gender"]);
        let simple = reduced.simple(Some("interactions")).unwrap();
        assert_eq!(simple["male"], 40);
        assert_eq!(simple["female"], 60);
        assert!(!reduced.to_value().to_string().contains("dimension:age"));
    }

    #[test]
    fn test_pivot_refuses_to_drop_outer_dimension() {
        let err = gender_age().pivot(&dims(&["age"]), true).unwrap_err();
        assert!(matches!(err, Error::IncompatibleDimensions(_)));
    }

    #[test]
    fn test_new_rejects_tree_nested_out_of_order() {
        let dataset = gender_age();
        let err = DataSet::new(dims(&["age", "gender"]), dataset.data().clone()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_is_compatible() {
        let full = gender_age();
        let single = DataSet::from_value(
            dims(&["age"]),
            &json!({"measure:interactions": {"dimension:age": {"18-24": leaf(5)}}}),
        )
        .unwrap();

        assert!(single.is_compatible(&full, true));
        assert!(!single.is_compatible(&full, false));
        assert!(!full.is_compatible(&single, true));
        assert!(full.is_compatible(&full.pivot(&dims(&["age", "gender"]), false).unwrap(), false));
    }

    #[test]
    fn test_simple_strips_scaffolding() {
        let simple = gender_age().simple(Some("interactions")).unwrap();

        let expected: BTreeMap<String, u64> = [
            ("female:18-24".to_string(), 60),
            ("male:18-24".to_string(), 40),
        ]
        .into_iter()
        .collect();
        assert_eq!(simple, expected);
    }

    #[test]
    fn test_simple_without_measure_prefixes_measure_name() {
        let data = json!({
            "measure:interactions": {"%VALUE%": 9, "%REDACTED%": false},
            "measure:unique_authors": {
                "%VALUE%": 4, "%REDACTED%": false,
                "dimension:age": {"25-34": leaf(4)}
            }
        });
        let dataset = DataSet::from_value(dims(&["age"]), &data).unwrap();

        let simple = dataset.simple(None).unwrap();
        assert_eq!(simple.len(), 2);
        assert_eq!(simple["interactions"], 9);
        assert_eq!(simple["unique_authors:25-34"], 4);

        let authors = dataset.simple(Some("unique_authors")).unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors["25-34"], 4);
    }

    #[test]
    fn test_empty_breakdown_keeps_count_and_round_trips() {
        let data = json!({
            "measure:interactions": {
                "%VALUE%": 5, "%REDACTED%": false,
                "dimension:a": {
                    "x": {"%VALUE%": 5, "%REDACTED%": false, "dimension:b": {}}
                }
            }
        });
        let dataset = DataSet::from_value(dims(&["a", "b"]), &data).unwrap();

        let simple = dataset.simple(Some("interactions")).unwrap();
        assert_eq!(simple.len(), 1);
        assert_eq!(simple["x"], 5);

        assert_eq!(dataset.pivot(&dims(&["a", "b"]), false).unwrap(), dataset);
        let back = dataset
            .pivot(&dims(&["b", "a"]), false)
            .unwrap()
            .pivot(&dims(&["a", "b"]), false)
            .unwrap();
        assert_eq!(back, dataset);
    }

    #[test]
    fn test_new_prunes_hand_built_empty_breakdown() {
        let mut root = Node::leaf(Count::new(7));
        root.breakdowns.push(Breakdown::new("age"));
        let tree = Tree {
            measures: [(Measure::Interactions, root)].into_iter().collect(),
        };

        let dataset = DataSet::new(dims(&["age"]), tree).unwrap();
        let root = dataset.data().measure(Measure::Interactions).unwrap();
        assert!(root.breakdowns.is_empty());
        assert_eq!(dataset.pivot(&dims(&["age"]), false).unwrap(), dataset);
    }

    #[test]
    fn test_from_json_checks_nesting() {
        let body = r#"{"measure:interactions": {"dimension:age": {"18-24": {"%VALUE%": 3, "%REDACTED%": false}}}}"#;
        let dataset = DataSet::from_json(dims(&["age"]), body).unwrap();
        assert_eq!(dataset.simple(None).unwrap()["interactions:18-24"], 3);

        let err = DataSet::from_json(dims(&["gender"]), body).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = DataSet::from_json(dims(&["age"]), "not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_simple_rejects_unknown_measure() {
        let err = gender_age().simple(Some("likes")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
