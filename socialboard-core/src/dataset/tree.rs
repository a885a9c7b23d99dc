//! Typed aggregation tree
//!
//! Wire form (one object per measure):
//!
//! ```text
//! {
//!   "measure:interactions": {
//!     "%VALUE%": 100, "%REDACTED%": false,
//!     "dimension:fb.author.gender": {
//!       "male":   { "%VALUE%": 40, "%REDACTED%": false, "dimension:fb.author.age": { ... } },
//!       "female": { "%VALUE%": 60, "%REDACTED%": false }
//!     }
//!   }
//! }
//! ```
//!
//! A node may carry a count, breakdowns, or both. Nodes rebuilt by a pivot can
//! lack a count when the source tree had no value for that combination.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const VALUE_KEY: &str = "%VALUE%";
pub const REDACTED_KEY: &str = "%REDACTED%";
pub const MEASURE_PREFIX: &str = "measure:";
pub const DIMENSION_PREFIX: &str = "dimension:";

/// Aggregated quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Measure {
    Interactions,
    UniqueAuthors,
}

impl Measure {
    pub const ALL: [Measure; 2] = [Measure::Interactions, Measure::UniqueAuthors];

    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Interactions => "interactions",
            Measure::UniqueAuthors => "unique_authors",
        }
    }

    /// Key of this measure in the wire form, e.g. `measure:interactions`
    pub fn key(&self) -> String {
        format!("{}{}", MEASURE_PREFIX, self.as_str())
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "interactions" => Ok(Measure::Interactions),
            "unique_authors" => Ok(Measure::UniqueAuthors),
            _ => Err(Error::InvalidArgument(format!("unknown measure: {}", s))),
        }
    }
}

/// Scalar leaf pair.
///
/// When `redacted` is set the upstream withheld the real count and `value`
/// must not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub value: u64,
    pub redacted: bool,
}

impl Count {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            redacted: false,
        }
    }

    pub fn redacted(value: u64) -> Self {
        Self {
            value,
            redacted: true,
        }
    }
}

/// Values of one dimension below a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakdown {
    pub target: String,
    pub members: BTreeMap<String, Node>,
}

impl Breakdown {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            members: BTreeMap::new(),
        }
    }
}

/// One node of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub count: Option<Count>,
    /// Breakdowns in nesting order
    pub breakdowns: Vec<Breakdown>,
}

impl Node {
    pub fn leaf(count: Count) -> Self {
        Self {
            count: Some(count),
            breakdowns: Vec::new(),
        }
    }

    /// A node is a leaf when no breakdown below it has any member.
    pub fn is_leaf(&self) -> bool {
        self.breakdowns.iter().all(|b| b.members.is_empty())
    }

    /// Remove members that carry no count, then breakdowns left without
    /// members, at every depth.
    pub(crate) fn prune_empty(&mut self) {
        for breakdown in &mut self.breakdowns {
            for child in breakdown.members.values_mut() {
                child.prune_empty();
            }
            breakdown
                .members
                .retain(|_, child| child.count.is_some() || !child.breakdowns.is_empty());
        }
        self.breakdowns.retain(|b| !b.members.is_empty());
    }

    pub fn breakdown(&self, target: &str) -> Option<&Breakdown> {
        self.breakdowns.iter().find(|b| b.target == target)
    }

    /// Follow `(target, value)` pairs down the tree.
    pub fn descend<'a, I>(&self, path: I) -> Option<&Node>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        path.into_iter().try_fold(self, |node, (target, value)| {
            node.breakdown(target)?.members.get(value)
        })
    }

    fn from_value(value: &Value, location: &str) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            Error::InvalidArgument(format!("expected an object at {}", location))
        })?;

        let mut node = Node::default();
        let mut raw_value = None;
        let mut raw_redacted = None;

        for (key, child) in object {
            if key == VALUE_KEY {
                raw_value = Some(child.as_u64().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "{} at {} must be a non-negative integer",
                        VALUE_KEY, location
                    ))
                })?);
            } else if key == REDACTED_KEY {
                raw_redacted = Some(child.as_bool().ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "{} at {} must be a boolean",
                        REDACTED_KEY, location
                    ))
                })?);
            } else if let Some(target) = key.strip_prefix(DIMENSION_PREFIX) {
                let members = child.as_object().ok_or_else(|| {
                    Error::InvalidArgument(format!("expected an object at {}/{}", location, key))
                })?;
                let mut breakdown = Breakdown::new(target);
                for (member, member_value) in members {
                    let member_location = format!("{}/{}/{}", location, key, member);
                    breakdown.members.insert(
                        member.clone(),
                        Node::from_value(member_value, &member_location)?,
                    );
                }
                // A threshold can cut every member of a breakdown
                if !breakdown.members.is_empty() {
                    node.breakdowns.push(breakdown);
                }
            } else {
                return Err(Error::InvalidArgument(format!(
                    "unexpected key {} at {}",
                    key, location
                )));
            }
        }

        node.count = match (raw_value, raw_redacted) {
            (Some(value), Some(redacted)) => Some(Count { value, redacted }),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "{} and {} must appear together at {}",
                    VALUE_KEY, REDACTED_KEY, location
                )))
            }
        };

        Ok(node)
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(count) = self.count {
            object.insert(VALUE_KEY.to_string(), Value::from(count.value));
            object.insert(REDACTED_KEY.to_string(), Value::Bool(count.redacted));
        }
        for breakdown in self.breakdowns.iter().filter(|b| !b.members.is_empty()) {
            let members: Map<String, Value> = breakdown
                .members
                .iter()
                .map(|(member, node)| (member.clone(), node.to_value()))
                .collect();
            object.insert(
                format!("{}{}", DIMENSION_PREFIX, breakdown.target),
                Value::Object(members),
            );
        }
        Value::Object(object)
    }
}

/// Whole aggregation result: one root node per measure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub measures: BTreeMap<Measure, Node>,
}

impl Tree {
    pub fn measure(&self, measure: Measure) -> Option<&Node> {
        self.measures.get(&measure)
    }

    /// Parse the wire form.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::InvalidArgument("data must be an object".to_string()))?;

        let mut measures = BTreeMap::new();
        for (key, child) in object {
            let name = key.strip_prefix(MEASURE_PREFIX).ok_or_else(|| {
                Error::InvalidArgument(format!("top-level key {} is not a measure", key))
            })?;
            let measure: Measure = name.parse()?;
            measures.insert(measure, Node::from_value(child, key)?);
        }
        Ok(Self { measures })
    }

    /// Parse a raw aggregation response body.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(&value)
    }

    /// Emit the wire form.
    pub fn to_value(&self) -> Value {
        let object: Map<String, Value> = self
            .measures
            .iter()
            .map(|(measure, node)| (measure.key(), node.to_value()))
            .collect();
        Value::Object(object)
    }
}
