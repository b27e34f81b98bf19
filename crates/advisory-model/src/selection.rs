//! Activity selections
//!
//! Requests store which catalog activities a consultant picked in one of two
//! historical JSON shapes. Both are parsed leniently (a wrong-typed field is
//! dropped, never an error) and then normalized into one flat list of
//! [`SelectedItem`]s that the estimator consumes.
//!
//! Legacy, flat:
//! ```json
//! { "activities": { "a1": { "selected": true, "estimated_hours": 4 } },
//!   "subActivities": { "s1": true } }
//! ```
//! Legacy, nested under the activity id:
//! ```json
//! { "a1": { "selected": true, "estimated_hours": 10, "subActivities": { "s1": true } } }
//! ```
//! Multi-offering:
//! ```json
//! { "off1": { "activities": { "a1": { "selected": true, "estimated_hours": 3,
//!                                      "subActivities": { "s1": { "selected": true, "estimated_hours": 2 } } } } } }
//! ```

use crate::ids::CatalogId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const ACTIVITIES_KEY: &str = "activities";
const SUB_ACTIVITIES_KEY: &str = "subActivities";
const SELECTED_KEY: &str = "selected";
const HOURS_KEY: &str = "estimated_hours";

/// One selectable entry: a bare flag or an object with its own hours
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionNode {
    /// Bare boolean; hours live in the catalog
    Flag(bool),
    /// Object form carrying its own estimate
    Detailed {
        /// Selected flag
        selected: bool,
        /// Hours, kept only when finite and non-negative
        estimated_hours: Option<f64>,
    },
}

impl SelectionNode {
    /// Parse a stored node; anything but a bool or object yields `None`
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self::Flag(*flag)),
            Value::Object(obj) => Some(Self::from_object(obj)),
            _ => None,
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        Self::Detailed {
            selected: obj.get(SELECTED_KEY).and_then(Value::as_bool) == Some(true),
            estimated_hours: obj
                .get(HOURS_KEY)
                .and_then(Value::as_f64)
                .filter(|h| h.is_finite() && *h >= 0.0),
        }
    }

    /// Whether the node counts as selected
    #[inline]
    #[must_use]
    pub fn is_selected(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Detailed { selected, .. } => *selected,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Self::Flag(flag) => Value::Bool(flag),
            Self::Detailed {
                selected,
                estimated_hours,
            } => {
                let mut obj = Map::new();
                obj.insert(SELECTED_KEY.into(), Value::Bool(selected));
                if let Some(hours) = estimated_hours {
                    obj.insert(HOURS_KEY.into(), Value::from(hours));
                }
                Value::Object(obj)
            }
        }
    }
}

/// Activity entry of the nested and multi-offering shapes
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityNode {
    /// The activity's own node
    pub node: SelectionNode,
    /// Sub-activities keyed by catalog id
    pub sub_activities: BTreeMap<CatalogId, SelectionNode>,
}

impl ActivityNode {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self {
                node: SelectionNode::Flag(*flag),
                sub_activities: BTreeMap::new(),
            }),
            Value::Object(obj) => Some(Self {
                node: SelectionNode::from_object(obj),
                sub_activities: parse_nodes(obj.get(SUB_ACTIVITIES_KEY)),
            }),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        if self.sub_activities.is_empty() {
            if let SelectionNode::Flag(flag) = self.node {
                return Value::Bool(flag);
            }
        }
        let mut obj = match self.node.to_value() {
            Value::Object(obj) => obj,
            Value::Bool(flag) => {
                let mut obj = Map::new();
                obj.insert(SELECTED_KEY.into(), Value::Bool(flag));
                obj
            }
            _ => Map::new(),
        };
        if !self.sub_activities.is_empty() {
            obj.insert(
                SUB_ACTIVITIES_KEY.into(),
                nodes_to_value(&self.sub_activities),
            );
        }
        Value::Object(obj)
    }
}

fn parse_nodes(value: Option<&Value>) -> BTreeMap<CatalogId, SelectionNode> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(id, v)| SelectionNode::from_value(v).map(|n| (CatalogId::new(id), n)))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_activities(value: Option<&Value>) -> BTreeMap<CatalogId, ActivityNode> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(id, v)| ActivityNode::from_value(v).map(|n| (CatalogId::new(id), n)))
                .collect()
        })
        .unwrap_or_default()
}

fn nodes_to_value(nodes: &BTreeMap<CatalogId, SelectionNode>) -> Value {
    Value::Object(
        nodes
            .iter()
            .map(|(id, node)| (id.0.clone(), node.to_value()))
            .collect(),
    )
}

fn activities_to_value(nodes: &BTreeMap<CatalogId, ActivityNode>) -> Value {
    Value::Object(
        nodes
            .iter()
            .map(|(id, node)| (id.0.clone(), node.to_value()))
            .collect(),
    )
}

/// Single-offering selection (`selected_activities` column)
#[derive(Debug, Clone, PartialEq)]
pub enum LegacySelection {
    /// `{ activities: {..}, subActivities: {..} }`
    Flat {
        /// Activities keyed by id
        activities: BTreeMap<CatalogId, SelectionNode>,
        /// Sub-activities keyed by id, parent unknown
        sub_activities: BTreeMap<CatalogId, SelectionNode>,
    },
    /// `{ activityId: { selected, estimated_hours, subActivities } }`
    Nested(BTreeMap<CatalogId, ActivityNode>),
}

impl Default for LegacySelection {
    fn default() -> Self {
        Self::Nested(BTreeMap::new())
    }
}

impl LegacySelection {
    /// Parse stored JSON; never fails
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        if is_flat(obj) {
            Self::Flat {
                activities: parse_nodes(obj.get(ACTIVITIES_KEY)),
                sub_activities: parse_nodes(obj.get(SUB_ACTIVITIES_KEY)),
            }
        } else {
            Self::Nested(
                obj.iter()
                    .filter_map(|(id, v)| {
                        ActivityNode::from_value(v).map(|n| (CatalogId::new(id), n))
                    })
                    .collect(),
            )
        }
    }

    /// Stored JSON form
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Flat {
                activities,
                sub_activities,
            } => {
                let mut obj = Map::new();
                obj.insert(ACTIVITIES_KEY.into(), nodes_to_value(activities));
                obj.insert(SUB_ACTIVITIES_KEY.into(), nodes_to_value(sub_activities));
                Value::Object(obj)
            }
            Self::Nested(activities) => activities_to_value(activities),
        }
    }

    /// No entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat {
                activities,
                sub_activities,
            } => activities.is_empty() && sub_activities.is_empty(),
            Self::Nested(activities) => activities.is_empty(),
        }
    }
}

fn is_flat(obj: &Map<String, Value>) -> bool {
    [ACTIVITIES_KEY, SUB_ACTIVITIES_KEY]
        .iter()
        .any(|key| obj.get(*key).is_some_and(Value::is_object))
}

/// Activities picked under one service offering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferingSelection {
    /// Activities keyed by id
    pub activities: BTreeMap<CatalogId, ActivityNode>,
}

/// Multi-offering selection (`service_offering_activities` column)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiOfferingSelection {
    /// Offerings keyed by id
    pub offerings: BTreeMap<CatalogId, OfferingSelection>,
}

impl MultiOfferingSelection {
    /// Parse stored JSON; never fails
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let offerings = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(id, v)| {
                        let activities = v.as_object()?.get(ACTIVITIES_KEY)?;
                        activities.is_object().then(|| {
                            (
                                CatalogId::new(id),
                                OfferingSelection {
                                    activities: parse_activities(Some(activities)),
                                },
                            )
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { offerings }
    }

    /// Stored JSON form
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.offerings
                .iter()
                .map(|(id, offering)| {
                    let mut obj = Map::new();
                    obj.insert(
                        ACTIVITIES_KEY.into(),
                        activities_to_value(&offering.activities),
                    );
                    (id.0.clone(), Value::Object(obj))
                })
                .collect(),
        )
    }

    /// No offerings at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
    }
}

macro_rules! lenient_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_value().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = Value::deserialize(deserializer)?;
                Ok(Self::from_value(&value))
            }
        }
    };
}

lenient_serde!(LegacySelection);
lenient_serde!(MultiOfferingSelection);

/// Either stored shape, with an explicit discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum ActivitySelection {
    /// Single-offering shape
    Legacy(LegacySelection),
    /// Keyed by service offering
    MultiOffering(MultiOfferingSelection),
}

impl ActivitySelection {
    /// Classify untagged stored JSON
    ///
    /// An object whose every value carries an `activities` object is the
    /// multi-offering shape; everything else is read as legacy.
    #[must_use]
    pub fn detect(value: &Value) -> Self {
        let multi = value.as_object().is_some_and(|obj| {
            !obj.is_empty()
                && !is_flat(obj)
                && obj.values().all(|v| {
                    v.as_object()
                        .and_then(|o| o.get(ACTIVITIES_KEY))
                        .is_some_and(Value::is_object)
                })
        });
        if multi {
            Self::MultiOffering(MultiOfferingSelection::from_value(value))
        } else {
            Self::Legacy(LegacySelection::from_value(value))
        }
    }
}

/// Where an item's hours come from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemHours {
    /// Hours stored on the selection node
    Embedded(f64),
    /// Bare `true` sub-activity: look the hours up in the catalog
    FromCatalog,
    /// Selected but without usable hours; contributes zero
    Unspecified,
}

/// One selected activity or sub-activity after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    /// Offering, when the selection was multi-offering
    pub offering_id: Option<CatalogId>,
    /// Activity (for a sub-activity: its parent, when known)
    pub activity_id: Option<CatalogId>,
    /// Sub-activity, for sub-activity items
    pub sub_activity_id: Option<CatalogId>,
    /// Hours source
    pub hours: ItemHours,
}

impl SelectedItem {
    /// Whether this item is a sub-activity
    #[inline]
    #[must_use]
    pub fn is_sub_activity(&self) -> bool {
        self.sub_activity_id.is_some()
    }
}

/// Canonical list of selected items, in a stable order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSelection {
    items: Vec<SelectedItem>,
}

impl NormalizedSelection {
    /// Normalize a legacy selection
    #[must_use]
    pub fn from_legacy(selection: &LegacySelection) -> Self {
        let mut out = Self::default();
        match selection {
            LegacySelection::Flat {
                activities,
                sub_activities,
            } => {
                for (id, node) in activities {
                    out.push_activity(None, id, *node);
                }
                for (id, node) in sub_activities {
                    out.push_sub_activity(None, None, id, *node);
                }
            }
            LegacySelection::Nested(activities) => {
                for (id, activity) in activities {
                    out.push_activity_tree(None, id, activity);
                }
            }
        }
        out
    }

    /// Normalize a multi-offering selection
    #[must_use]
    pub fn from_multi(selection: &MultiOfferingSelection) -> Self {
        let mut out = Self::default();
        for (offering_id, offering) in &selection.offerings {
            for (id, activity) in &offering.activities {
                out.push_activity_tree(Some(offering_id), id, activity);
            }
        }
        out
    }

    /// Normalize either shape
    #[must_use]
    pub fn from_selection(selection: &ActivitySelection) -> Self {
        match selection {
            ActivitySelection::Legacy(legacy) => Self::from_legacy(legacy),
            ActivitySelection::MultiOffering(multi) => Self::from_multi(multi),
        }
    }

    fn push_activity_tree(
        &mut self,
        offering_id: Option<&CatalogId>,
        id: &CatalogId,
        activity: &ActivityNode,
    ) {
        self.push_activity(offering_id, id, activity.node);
        for (sub_id, node) in &activity.sub_activities {
            self.push_sub_activity(offering_id, Some(id), sub_id, *node);
        }
    }

    fn push_activity(&mut self, offering_id: Option<&CatalogId>, id: &CatalogId, node: SelectionNode) {
        let hours = match node {
            SelectionNode::Flag(true) => ItemHours::Unspecified,
            SelectionNode::Detailed {
                selected: true,
                estimated_hours,
            } => estimated_hours.map_or(ItemHours::Unspecified, ItemHours::Embedded),
            _ => return,
        };
        self.items.push(SelectedItem {
            offering_id: offering_id.cloned(),
            activity_id: Some(id.clone()),
            sub_activity_id: None,
            hours,
        });
    }

    fn push_sub_activity(
        &mut self,
        offering_id: Option<&CatalogId>,
        parent: Option<&CatalogId>,
        id: &CatalogId,
        node: SelectionNode,
    ) {
        let hours = match node {
            SelectionNode::Flag(true) => ItemHours::FromCatalog,
            SelectionNode::Detailed {
                selected: true,
                estimated_hours,
            } => estimated_hours.map_or(ItemHours::Unspecified, ItemHours::Embedded),
            _ => return,
        };
        self.items.push(SelectedItem {
            offering_id: offering_id.cloned(),
            activity_id: parent.cloned(),
            sub_activity_id: Some(id.clone()),
            hours,
        });
    }

    /// Selected items
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[SelectedItem] {
        &self.items
    }

    /// Iterate selected items
    pub fn iter(&self) -> impl Iterator<Item = &SelectedItem> {
        self.items.iter()
    }

    /// Number of selected items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Nothing selected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sub-activities whose hours must come from the catalog
    pub fn catalog_lookups(&self) -> impl Iterator<Item = &CatalogId> {
        self.items
            .iter()
            .filter(|item| item.hours == ItemHours::FromCatalog)
            .filter_map(|item| item.sub_activity_id.as_ref())
    }
}
