//! Dimensions and ordered dimension collections
//!
//! A [`Dimension`] is one axis of breakdown (e.g. `fb.author.gender`). A
//! [`DimensionCollection`] keeps dimensions in a significant order: it is the
//! nesting order of a data tree and the order analyses are chained in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// One axis of analysis.
///
/// `target` is the identity of the dimension and never changes after
/// construction. The remaining fields are metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    target: String,
    /// Estimated distinct-value count, `None` when unknown
    #[serde(default)]
    pub cardinality: Option<u64>,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// Maximum number of result rows wanted for this dimension
    #[serde(default)]
    pub threshold: Option<u32>,
}

impl Dimension {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            cardinality: None,
            label: None,
            threshold: None,
        }
    }

    pub fn with_cardinality(mut self, cardinality: u64) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_cardinality(&mut self, cardinality: Option<u64>) {
        self.cardinality = cardinality;
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn set_threshold(&mut self, threshold: Option<u32>) {
        self.threshold = threshold;
    }

    /// Label for display, falling back to the target.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.target)
    }
}

/// Iteration order for [`DimensionCollection::dimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DimensionOrder {
    /// Insertion order
    #[default]
    Natural,
    /// Highest cardinality first; unknown cardinality counts as infinite
    CardinalityDesc,
}

/// Ordered set of dimensions, unique by target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct DimensionCollection {
    dimensions: Vec<Dimension>,
}

impl DimensionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate targets.
    pub fn from_dimensions(dimensions: impl IntoIterator<Item = Dimension>) -> Result<Self> {
        let mut collection = Self::new();
        for dimension in dimensions {
            collection.add_dimension(dimension)?;
        }
        Ok(collection)
    }

    /// Append a dimension.
    ///
    /// A second dimension with an already present target is rejected.
    pub fn add_dimension(&mut self, dimension: Dimension) -> Result<()> {
        if self.contains(dimension.target()) {
            return Err(Error::InvalidArgument(format!(
                "dimension {} is already part of the collection",
                dimension.target()
            )));
        }
        self.dimensions.push(dimension);
        Ok(())
    }

    /// Dimensions in the requested order.
    ///
    /// The cardinality sort is stable, so equal cardinalities keep their
    /// insertion order.
    pub fn dimensions(&self, order: DimensionOrder) -> Vec<&Dimension> {
        let mut dimensions: Vec<&Dimension> = self.dimensions.iter().collect();
        if order == DimensionOrder::CardinalityDesc {
            dimensions.sort_by_key(|d| Reverse(d.cardinality.unwrap_or(u64::MAX)));
        }
        dimensions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dimension> {
        self.dimensions.iter()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.position(target).is_some()
    }

    pub fn get(&self, target: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.target == target)
    }

    /// Nesting depth of `target` in this collection.
    pub fn position(&self, target: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.target == target)
    }

    pub fn targets(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.target()).collect()
    }

    /// Same set of targets, regardless of order.
    pub fn is_same(&self, other: &DimensionCollection) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }

    /// Every dimension of `self` has a dimension with the same target in `other`.
    pub fn is_subset(&self, other: &DimensionCollection) -> bool {
        self.dimensions.iter().all(|d| other.contains(d.target()))
    }

    /// The dimensions of `self` whose targets appear in `other`, in `other`'s order.
    ///
    /// Fails unless `self` is a subset of `other`.
    pub fn ordered_subset(&self, other: &DimensionCollection) -> Result<DimensionCollection> {
        if !self.is_subset(other) {
            return Err(Error::IncompatibleDimensions(format!(
                "[{}] is not a subset of [{}]",
                self.targets().join(", "),
                other.targets().join(", ")
            )));
        }

        Ok(self.restricted_to(other))
    }

    /// The dimensions of `self` whose targets appear in `other`, in `other`'s
    /// order, without requiring either collection to contain the other.
    pub fn restricted_to(&self, other: &DimensionCollection) -> DimensionCollection {
        let dimensions = other
            .iter()
            .filter_map(|d| self.get(d.target()).cloned())
            .collect();
        DimensionCollection { dimensions }
    }
}

impl TryFrom<Vec<Dimension>> for DimensionCollection {
    type Error = Error;

    fn try_from(dimensions: Vec<Dimension>) -> Result<Self> {
        Self::from_dimensions(dimensions)
    }
}

impl From<DimensionCollection> for Vec<Dimension> {
    fn from(collection: DimensionCollection) -> Self {
        collection.dimensions
    }
}

impl<'a> IntoIterator for &'a DimensionCollection {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.dimensions.iter()
    }
}
