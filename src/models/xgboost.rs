//! XGBoost JSON model loader and tree-ensemble evaluator.
//!
//! Parses the subset of the XGBoost >= 1.6 JSON format (`save_model("*.json")`)
//! needed to score gbtree/dart ensembles: trees with numeric and categorical
//! splits, the learner's base score and its objective.
//!
//! Trees are validated once at load time and compiled into a flat node list;
//! a prediction is then a handful of array walks.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{DisplayFromStr, serde_as};

use crate::domain::{Feature, InputRecord, Prediction};
use crate::models::{Classifier, ModelError, PredictError};

// =============================================================================
// Custom deserializers for XGBoost-specific encodings
// =============================================================================

/// `base_score` shows up as a number, a numeric string, a bracketed string
/// (`"[5E-1]"`) or a per-class array depending on the writer version.
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let mut cur = Value::deserialize(deserializer)?;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SerdeError::custom("invalid base_score number"));
            }
            Value::String(s) => {
                let t = s.trim();
                if let Ok(f) = t.parse::<f32>() {
                    return Ok(f);
                }
                let inner = t.strip_prefix('[').and_then(|t| t.strip_suffix(']'));
                match inner.and_then(|i| i.split(',').next()) {
                    Some(first) => {
                        return first.trim().parse::<f32>().map_err(|_| {
                            SerdeError::custom(format!("cannot parse base_score from '{s}'"))
                        });
                    }
                    None => {
                        return Err(SerdeError::custom(format!(
                            "cannot parse base_score from '{s}'"
                        )));
                    }
                }
            }
            Value::Array(arr) => match arr.into_iter().next() {
                Some(first) => cur = first,
                None => return Err(SerdeError::custom("empty base_score array")),
            },
            _ => {
                return Err(SerdeError::custom(
                    "base_score must be a number, string, or array",
                ));
            }
        }
    }
}

/// `default_left` is written as ints (0/1) by most versions and as bools by some.
fn deserialize_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let values = Vec::<Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                other => Err(SerdeError::custom(format!("cannot parse flag from '{other}'"))),
            },
            _ => Err(SerdeError::custom("unsupported flag type")),
        })
        .collect()
}

// =============================================================================
// Foreign types (parse only)
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    num_nodes: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct XgbTree {
    tree_param: TreeParam,
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i32>,
    split_conditions: Vec<f32>,
    #[serde(default)]
    split_type: Vec<i32>,
    #[serde(deserialize_with = "deserialize_flags")]
    default_left: Vec<bool>,
    #[serde(default)]
    categories: Vec<i32>,
    #[serde(default)]
    categories_nodes: Vec<i32>,
    #[serde(default)]
    categories_segments: Vec<i64>,
    #[serde(default)]
    categories_sizes: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelTrees {
    trees: Vec<XgbTree>,
    #[serde(default)]
    tree_info: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct GbTreeDefinition {
    model: ModelTrees,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Dart {
        gbtree: GbTreeDefinition,
        #[serde(default)]
        weight_drop: Vec<f32>,
    },
    Gblinear {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectiveDef {
    name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    base_score: f32,
    #[serde_as(as = "DisplayFromStr")]
    num_class: i64,
    #[serde_as(as = "DisplayFromStr")]
    num_feature: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    objective: ObjectiveDef,
    learner_model_param: LearnerModelParam,
}

#[derive(Debug, Clone, Deserialize)]
struct XgbModel {
    learner: Learner,
}

// =============================================================================
// Native representation
// =============================================================================

/// How raw margins are turned into a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic`, `binary:logitraw`, `binary:hinge`: class 1 iff margin > 0.
    Binary(String),
    /// `multi:softprob`, `multi:softmax`: argmax over output groups.
    MultiClass(String),
    /// `reg:logistic`: sigmoid score.
    Logistic,
    /// `count:poisson`, `reg:gamma`, `reg:tweedie`: exp score.
    LogLink(String),
    /// Anything else: the raw margin.
    Identity(String),
}

impl Objective {
    fn from_name(name: &str) -> Self {
        match name {
            "binary:logistic" | "binary:logitraw" | "binary:hinge" => Objective::Binary(name.to_string()),
            "multi:softprob" | "multi:softmax" => Objective::MultiClass(name.to_string()),
            "reg:logistic" => Objective::Logistic,
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Objective::LogLink(name.to_string()),
            other => Objective::Identity(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Objective::Binary(n) | Objective::MultiClass(n) | Objective::LogLink(n) | Objective::Identity(n) => n,
            Objective::Logistic => "reg:logistic",
        }
    }

    /// Convert a base score stored in probability/output space to margin space.
    fn base_margin(&self, base_score: f32) -> f32 {
        match self.name() {
            "binary:logistic" | "reg:logistic" => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln()
            }
            "count:poisson" | "reg:gamma" | "reg:tweedie" => base_score.max(1e-7).ln(),
            _ => base_score,
        }
    }

    fn decode(&self, margins: &[f32]) -> Result<Prediction, PredictError> {
        if margins.iter().any(|m| !m.is_finite()) {
            return Err(PredictError::NonFinite);
        }
        let first = margins.first().copied().unwrap_or(0.0) as f64;
        Ok(match self {
            Objective::Binary(_) => Prediction::Class(u32::from(first > 0.0)),
            Objective::MultiClass(_) => {
                let mut best = 0usize;
                for (idx, m) in margins.iter().enumerate() {
                    if *m > margins[best] {
                        best = idx;
                    }
                }
                Prediction::Class(best as u32)
            }
            Objective::Logistic => Prediction::Score(1.0 / (1.0 + (-first).exp())),
            Objective::LogLink(_) => Prediction::Score(first.exp()),
            Objective::Identity(_) => Prediction::Score(first),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f32),
    Numeric {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: usize,
        right: usize,
    },
    /// Values in `right_set` go right; everything else (including negative
    /// or unseen codes) goes left.
    Categorical {
        feature: usize,
        right_set: Vec<u32>,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct CompiledTree {
    nodes: Vec<Node>,
    group: usize,
    weight: f32,
}

impl CompiledTree {
    fn leaf_value(&self, tree_idx: usize, row: &[f32]) -> Result<f32, PredictError> {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(v) => return Ok(*v),
                Node::Numeric {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = feature_value(row, *feature, tree_idx)?;
                    let go_left = if x.is_nan() { *default_left } else { x < *threshold };
                    idx = if go_left { *left } else { *right };
                }
                Node::Categorical {
                    feature,
                    right_set,
                    default_left,
                    left,
                    right,
                } => {
                    let x = feature_value(row, *feature, tree_idx)?;
                    let go_left = if x.is_nan() {
                        *default_left
                    } else if x < 0.0 {
                        true
                    } else {
                        right_set.binary_search(&(x as u32)).is_err()
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

fn feature_value(row: &[f32], feature: usize, tree: usize) -> Result<f32, PredictError> {
    row.get(feature).copied().ok_or(PredictError::FeatureIndex {
        tree,
        index: feature,
        n_features: row.len(),
    })
}

/// A gbtree/dart ensemble loaded from XGBoost JSON.
#[derive(Debug, Clone)]
pub struct XgbClassifier {
    feature_names: Vec<String>,
    n_features: usize,
    n_groups: usize,
    base_margin: f32,
    objective: Objective,
    trees: Vec<CompiledTree>,
}

impl XgbClassifier {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let model: XgbModel = serde_json::from_reader(BufReader::new(file))?;
        Self::compile(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: XgbModel = serde_json::from_str(json)?;
        Self::compile(model)
    }

    fn compile(model: XgbModel) -> Result<Self, ModelError> {
        let learner = model.learner;
        let objective = Objective::from_name(&learner.objective.name);
        let param = learner.learner_model_param;
        let n_groups = if param.num_class <= 1 { 1 } else { param.num_class as usize };

        let (model_trees, weights) = match learner.gradient_booster {
            GradientBooster::Gbtree { model } => (model, None),
            GradientBooster::Dart { gbtree, weight_drop } => (gbtree.model, Some(weight_drop)),
            GradientBooster::Gblinear {} => {
                return Err(ModelError::UnsupportedBooster("gblinear".to_string()));
            }
            GradientBooster::Other => {
                return Err(ModelError::UnsupportedBooster("unknown".to_string()));
            }
        };

        let mut trees = Vec::with_capacity(model_trees.trees.len());
        for (tree_idx, tree) in model_trees.trees.iter().enumerate() {
            let group = model_trees.tree_info.get(tree_idx).copied().unwrap_or(0);
            if group < 0 || group as usize >= n_groups {
                return Err(ModelError::InvalidTreeGroup {
                    tree: tree_idx,
                    group,
                    n_groups,
                });
            }
            let weight = weights
                .as_ref()
                .and_then(|w| w.get(tree_idx).copied())
                .unwrap_or(1.0);
            trees.push(CompiledTree {
                nodes: compile_tree(tree, tree_idx)?,
                group: group as usize,
                weight,
            });
        }

        Ok(Self {
            feature_names: learner.feature_names,
            n_features: param.num_feature.max(0) as usize,
            n_groups,
            base_margin: objective.base_margin(param.base_score),
            objective,
            trees,
        })
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    /// Lay the record out in the column order the model was trained with.
    fn feature_row(&self, record: &InputRecord) -> Result<Vec<f32>, PredictError> {
        if self.feature_names.is_empty() {
            let features = record.features();
            if self.n_features != features.len() {
                return Err(PredictError::FeatureCount {
                    expected: self.n_features,
                    actual: features.len(),
                });
            }
            return Ok(features.iter().map(|(_, v)| v.as_model_input()).collect());
        }

        self.feature_names
            .iter()
            .map(|name| {
                Feature::from_column(name)
                    .map(|f| record.value(f).as_model_input())
                    .ok_or_else(|| PredictError::MissingFeature(name.clone()))
            })
            .collect()
    }

    /// Raw per-group margins for an already laid-out row (NaN = missing).
    pub fn margins(&self, row: &[f32]) -> Result<Vec<f32>, PredictError> {
        let mut out = vec![self.base_margin; self.n_groups];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            out[tree.group] += tree.weight * tree.leaf_value(tree_idx, row)?;
        }
        Ok(out)
    }

    pub fn predict_row(&self, row: &[f32]) -> Result<Prediction, PredictError> {
        let margins = self.margins(row)?;
        self.objective.decode(&margins)
    }
}

impl Classifier for XgbClassifier {
    fn predict(&self, record: &InputRecord) -> Result<Prediction, PredictError> {
        let row = self.feature_row(record)?;
        self.predict_row(&row)
    }

    fn describe(&self) -> String {
        let outputs = match self.n_groups() {
            1 => String::new(),
            n => format!(", {n} outputs"),
        };
        format!(
            "XGBoost ({}, {} trees{outputs})",
            self.objective().name(),
            self.n_trees()
        )
    }
}

fn compile_tree(tree: &XgbTree, tree_idx: usize) -> Result<Vec<Node>, ModelError> {
    let num_nodes = tree.tree_param.num_nodes.max(0) as usize;
    if num_nodes == 0 {
        return Err(ModelError::EmptyTree(tree_idx));
    }

    let arrays: [(&'static str, usize); 5] = [
        ("left_children", tree.left_children.len()),
        ("right_children", tree.right_children.len()),
        ("split_indices", tree.split_indices.len()),
        ("split_conditions", tree.split_conditions.len()),
        ("default_left", tree.default_left.len()),
    ];
    for (field, actual) in arrays {
        if actual != num_nodes {
            return Err(ModelError::MalformedTree {
                tree: tree_idx,
                field,
                actual,
                expected: num_nodes,
            });
        }
    }

    let categorical = categorical_sets(tree, tree_idx)?;

    let mut nodes = Vec::with_capacity(num_nodes);
    for node_idx in 0..num_nodes {
        let left = tree.left_children[node_idx];
        if left == -1 {
            // Leaf values live in split_conditions (already scaled by eta).
            nodes.push(Node::Leaf(tree.split_conditions[node_idx]));
            continue;
        }
        let right = tree.right_children[node_idx];

        // XGBoost writes nodes in BFS order, so children always come after
        // their parent; rejecting anything else rules out cycles.
        for child in [left, right] {
            if child <= node_idx as i32 || child as usize >= num_nodes {
                return Err(ModelError::InvalidNodeIndex {
                    tree: tree_idx,
                    node: node_idx,
                    child,
                    num_nodes,
                });
            }
        }

        let feature = tree.split_indices[node_idx].max(0) as usize;
        let default_left = tree.default_left[node_idx];
        let is_categorical = tree.split_type.get(node_idx).copied().unwrap_or(0) == 1;

        nodes.push(if is_categorical {
            Node::Categorical {
                feature,
                right_set: categorical
                    .iter()
                    .find(|(n, _)| *n == node_idx)
                    .map(|(_, set)| set.clone())
                    .unwrap_or_default(),
                default_left,
                left: left as usize,
                right: right as usize,
            }
        } else {
            Node::Numeric {
                feature,
                threshold: tree.split_conditions[node_idx],
                default_left,
                left: left as usize,
                right: right as usize,
            }
        });
    }

    Ok(nodes)
}

/// Per-node category sets from XGBoost's parallel arrays.
///
/// `categories_nodes[i]` owns `categories[segments[i] .. segments[i] + sizes[i]]`,
/// stored as category values (not bitset words).
fn categorical_sets(tree: &XgbTree, tree_idx: usize) -> Result<Vec<(usize, Vec<u32>)>, ModelError> {
    let n = tree.categories_nodes.len();
    for (field, actual) in [
        ("categories_segments", tree.categories_segments.len()),
        ("categories_sizes", tree.categories_sizes.len()),
    ] {
        if actual != n {
            return Err(ModelError::MalformedTree {
                tree: tree_idx,
                field,
                actual,
                expected: n,
            });
        }
    }

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = tree.categories_segments[i].max(0) as usize;
        let size = tree.categories_sizes[i].max(0) as usize;
        let Some(values) = tree.categories.get(start..start + size) else {
            return Err(ModelError::MalformedTree {
                tree: tree_idx,
                field: "categories",
                actual: tree.categories.len(),
                expected: start + size,
            });
        };
        let mut set: Vec<u32> = values.iter().filter(|v| **v >= 0).map(|v| *v as u32).collect();
        set.sort_unstable();
        set.dedup();
        out.push((tree.categories_nodes[i].max(0) as usize, set));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{binary_model_json, record, stub_tree};
    use serde_json::json;

    #[test]
    fn base_score_accepts_all_encodings() {
        for raw in [json!(0.5), json!("0.5"), json!("[5E-1]"), json!([0.5, 0.5]), json!("[5E-1,5E-1]")] {
            let v = json!({"base_score": raw, "num_class": "0", "num_feature": "11"});
            let p: LearnerModelParam = serde_json::from_value(v).unwrap();
            assert_eq!(p.base_score, 0.5);
        }
    }

    #[test]
    fn default_left_accepts_ints_and_bools() {
        let mut tree = stub_tree();
        tree["default_left"] = json!([true, false, 0]);
        let parsed: XgbTree = serde_json::from_value(tree).unwrap();
        assert_eq!(parsed.default_left, vec![true, false, false]);
    }

    #[test]
    fn numeric_split_routes_by_threshold() {
        // Single stump on feature 1 (person_income) at 50_000; base_score 0.5 => margin 0.
        let model = XgbClassifier::from_json_str(&binary_model_json(1, 50_000.0, -1.0, 1.0)).unwrap();
        assert_eq!(model.n_trees(), 1);

        let mut r = record();
        r.person_income = 10_000;
        assert_eq!(model.predict(&r).unwrap(), Prediction::Class(0));
        r.person_income = 90_000;
        assert_eq!(model.predict(&r).unwrap(), Prediction::Class(1));
    }

    #[test]
    fn missing_value_follows_default_direction() {
        let model = XgbClassifier::from_json_str(&binary_model_json(0, 30.0, -1.0, 1.0)).unwrap();
        let mut row = vec![0.0f32; 11];
        row[0] = f32::NAN;
        // stub_tree marks the root default_left.
        assert_eq!(model.predict_row(&row).unwrap(), Prediction::Class(0));
    }

    #[test]
    fn categorical_split_sends_members_right() {
        let mut tree = stub_tree();
        tree["split_indices"] = json!([2, 0, 0]);
        tree["split_type"] = json!([1, 0, 0]);
        tree["split_conditions"] = json!([0.0, -1.0, 1.0]);
        tree["categories"] = json!([3]);
        tree["categories_nodes"] = json!([0]);
        tree["categories_segments"] = json!([0]);
        tree["categories_sizes"] = json!([1]);
        let json = crate::test_support::model_json(vec![tree], vec![0], "binary:logistic", "0", vec![]);
        let model = XgbClassifier::from_json_str(&json).unwrap();

        // Code 3 is in the set, code 1 is not.
        let mut row = vec![0.0f32; 11];
        row[2] = 3.0;
        assert_eq!(model.predict_row(&row).unwrap(), Prediction::Class(1));
        row[2] = 1.0;
        assert_eq!(model.predict_row(&row).unwrap(), Prediction::Class(0));
    }

    #[test]
    fn multiclass_decodes_argmax() {
        let trees = vec![
            crate::test_support::leaf_tree(0.2),
            crate::test_support::leaf_tree(0.1),
            crate::test_support::leaf_tree(0.9),
        ];
        let json = crate::test_support::model_json(trees, vec![0, 1, 2], "multi:softprob", "3", vec![]);
        let model = XgbClassifier::from_json_str(&json).unwrap();
        assert_eq!(model.n_groups(), 3);
        assert_eq!(model.predict(&record()).unwrap(), Prediction::Class(2));
    }

    #[test]
    fn features_resolve_by_name() {
        // The model only knows two columns, in its own order.
        let mut tree = stub_tree();
        tree["split_indices"] = json!([1, 0, 0]);
        tree["split_conditions"] = json!([35.0, -1.0, 1.0]);
        let names = vec!["loan_amnt".to_string(), "person_age".to_string()];
        let json = crate::test_support::model_json(vec![tree], vec![0], "binary:logistic", "0", names);
        let model = XgbClassifier::from_json_str(&json).unwrap();

        let mut r = record();
        r.person_age = 50;
        assert_eq!(model.predict(&r).unwrap(), Prediction::Class(1));
    }

    #[test]
    fn unknown_feature_name_is_a_predict_error() {
        let names = vec!["credit_score".to_string()];
        let json = crate::test_support::model_json(vec![stub_tree()], vec![0], "binary:logistic", "0", names);
        let model = XgbClassifier::from_json_str(&json).unwrap();
        assert_eq!(
            model.predict(&record()).unwrap_err(),
            PredictError::MissingFeature("credit_score".to_string())
        );
    }

    #[test]
    fn regression_objective_returns_raw_score() {
        let json = crate::test_support::model_json(
            vec![crate::test_support::leaf_tree(1.5)],
            vec![0],
            "reg:squarederror",
            "0",
            vec![],
        );
        let model = XgbClassifier::from_json_str(&json).unwrap();
        // base_score 0.5 + leaf 1.5
        assert_eq!(model.predict(&record()).unwrap(), Prediction::Score(2.0));
    }

    #[test]
    fn backward_child_reference_is_rejected() {
        let mut tree = stub_tree();
        tree["left_children"] = json!([0, -1, -1]);
        let json = crate::test_support::model_json(vec![tree], vec![0], "binary:logistic", "0", vec![]);
        assert!(matches!(
            XgbClassifier::from_json_str(&json),
            Err(ModelError::InvalidNodeIndex { node: 0, child: 0, .. })
        ));
    }

    #[test]
    fn gblinear_is_unsupported() {
        let json = json!({
            "version": [2, 0, 3],
            "learner": {
                "gradient_booster": {"name": "gblinear", "model": {"weights": [0.1, 0.2]}},
                "objective": {"name": "binary:logistic"},
                "learner_model_param": {"base_score": "0.5", "num_class": "0", "num_feature": "1"}
            }
        });
        assert!(matches!(
            XgbClassifier::from_json_str(&json.to_string()),
            Err(ModelError::UnsupportedBooster(_))
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            XgbClassifier::from_json_str("not json"),
            Err(ModelError::Parse(_))
        ));
    }
}
