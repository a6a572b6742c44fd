use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::{PredictionError, Regressor};
use crate::estimator::{FeatureVector, FEATURE_NAMES};

/// File name of the model inside the artifacts directory.
pub const MODEL_FILE: &str = "model.json";

/// Startup failures while loading a model. Any of these aborts initialization.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model feature schema {found:?} does not match {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("tree {tree} splits on unknown feature {feature:?}")]
    UnknownFeature { tree: usize, feature: String },

    #[error("tree {tree} node {node} points at {target}, which is not one of its children")]
    DanglingNode { tree: usize, node: u32, target: u32 },

    #[error("tree {tree} reuses node id {node}")]
    DuplicateNode { tree: usize, node: u32 },

    #[error("model has no trees")]
    Empty,
}

/// On-disk model layout, matching an XGBoost JSON tree dump plus the
/// feature schema and base score it was trained with.
#[derive(Debug, Deserialize)]
struct ModelDump {
    feature_names: Vec<String>,
    base_score: f64,
    trees: Vec<DumpNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpNode {
    Split {
        nodeid: u32,
        split: String,
        split_condition: f64,
        yes: u32,
        no: u32,
        missing: u32,
        children: Vec<DumpNode>,
    },
    Leaf {
        nodeid: u32,
        leaf: f64,
    },
}

impl DumpNode {
    fn id(&self) -> u32 {
        match self {
            Self::Split { nodeid, .. } | Self::Leaf { nodeid, .. } => *nodeid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

/// A single regression tree in arena form. The root is node 0.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn eval(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let x = row[feature];
                    idx = if x.is_nan() {
                        missing
                    } else if x < threshold {
                        yes
                    } else {
                        no
                    };
                }
            }
        }
    }
}

/// A gradient-boosted regression forest.
///
/// Prediction is `base_score + Σ leaf(tree)`. At each split a row goes to
/// `yes` when `value < split_condition`, to `no` otherwise, and to `missing`
/// for NaN.
///
/// # Model Format
///
/// ```json
/// {
///   "feature_names": ["total_cr_max", "mean_crew", ...],
///   "base_score": 0.5,
///   "trees": [
///     {"nodeid": 0, "split": "total_sqft", "split_condition": 500.0,
///      "yes": 1, "no": 2, "missing": 1,
///      "children": [{"nodeid": 1, "leaf": 1200.0}, {"nodeid": 2, "leaf": 4800.0}]}
///   ]
/// }
/// ```
///
/// `feature_names` must equal [`FEATURE_NAMES`] exactly, in order; a model
/// trained on any other schema is refused at load time.
#[derive(Debug, Clone)]
pub struct GbtModel {
    base_score: f64,
    trees: Vec<Tree>,
}

impl GbtModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json(&content)?;
        tracing::info!(
            trees = model.tree_count(),
            "Loaded model from {}",
            path.display()
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let dump: ModelDump = serde_json::from_str(json)?;

        if dump.feature_names != FEATURE_NAMES {
            return Err(ModelError::SchemaMismatch {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: dump.feature_names,
            });
        }
        if dump.trees.is_empty() {
            return Err(ModelError::Empty);
        }

        let trees = dump
            .trees
            .iter()
            .enumerate()
            .map(|(i, root)| build_tree(i, root))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_score: dump.base_score,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GbtModel {
    fn predict(&self, row: &FeatureVector) -> Result<f64, PredictionError> {
        let named = row.named();
        if let Some(&(name, value)) = named.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PredictionError::NonFiniteFeature { name, value });
        }

        let values = row.values();
        let output = self.base_score + self.trees.iter().map(|t| t.eval(&values)).sum::<f64>();
        if !output.is_finite() {
            return Err(PredictionError::NonFiniteOutput(output));
        }
        Ok(output)
    }
}

/// Flatten a nested dump into an arena, resolving child references by node id.
fn build_tree(tree: usize, root: &DumpNode) -> Result<Tree, ModelError> {
    let mut nodes = Vec::new();
    let mut seen = HashMap::new();
    push_node(tree, root, &mut nodes, &mut seen)?;
    Ok(Tree { nodes })
}

fn push_node(
    tree: usize,
    node: &DumpNode,
    nodes: &mut Vec<Node>,
    seen: &mut HashMap<u32, usize>,
) -> Result<usize, ModelError> {
    let idx = nodes.len();
    if seen.insert(node.id(), idx).is_some() {
        return Err(ModelError::DuplicateNode {
            tree,
            node: node.id(),
        });
    }

    match node {
        DumpNode::Leaf { leaf, .. } => {
            nodes.push(Node::Leaf(*leaf));
        }
        DumpNode::Split {
            nodeid,
            split,
            split_condition,
            yes,
            no,
            missing,
            children,
        } => {
            let feature = FEATURE_NAMES
                .iter()
                .position(|name| name == split)
                .ok_or_else(|| ModelError::UnknownFeature {
                    tree,
                    feature: split.clone(),
                })?;

            // Placeholder until the children have indices.
            nodes.push(Node::Leaf(0.0));

            let mut child_idx = HashMap::new();
            for child in children {
                let i = push_node(tree, child, nodes, seen)?;
                child_idx.insert(child.id(), i);
            }

            let resolve = |target: u32| {
                child_idx
                    .get(&target)
                    .copied()
                    .ok_or(ModelError::DanglingNode {
                        tree,
                        node: *nodeid,
                        target,
                    })
            };

            nodes[idx] = Node::Split {
                feature,
                threshold: *split_condition,
                yes: resolve(*yes)?,
                no: resolve(*no)?,
                missing: resolve(*missing)?,
            };
        }
    }

    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_json() -> String {
        serde_json::to_string(&FEATURE_NAMES).unwrap()
    }

    fn stump(feature: &str, threshold: f64, yes: f64, no: f64) -> String {
        format!(
            r#"{{"nodeid":0,"split":"{feature}","split_condition":{threshold},"yes":1,"no":2,"missing":2,
               "children":[{{"nodeid":1,"leaf":{yes}}},{{"nodeid":2,"leaf":{no}}}]}}"#
        )
    }

    fn model(trees: &[String], base_score: f64) -> Result<GbtModel, ModelError> {
        GbtModel::from_json(&format!(
            r#"{{"feature_names":{},"base_score":{base_score},"trees":[{}]}}"#,
            names_json(),
            trees.join(",")
        ))
    }

    fn row(total_sqft: f64, mean_crew: f64) -> FeatureVector {
        FeatureVector {
            total_sqft,
            mean_crew,
            ..FeatureVector::default()
        }
    }

    #[test]
    fn sums_leaves_and_base_score() {
        let model = model(
            &[
                stump("total_sqft", 500.0, 100.0, 200.0),
                stump("mean_crew", 3.0, -50.0, 50.0),
            ],
            10.0,
        )
        .unwrap();

        assert_eq!(model.predict(&row(100.0, 1.0)).unwrap(), 60.0);
        assert_eq!(model.predict(&row(600.0, 4.0)).unwrap(), 260.0);
    }

    #[test]
    fn split_threshold_is_strictly_less_than() {
        let model = model(&[stump("total_sqft", 500.0, 1.0, 2.0)], 0.0).unwrap();
        assert_eq!(model.predict(&row(500.0, 0.0)).unwrap(), 2.0);
        assert_eq!(model.predict(&row(499.9, 0.0)).unwrap(), 1.0);
    }

    #[test]
    fn walks_nested_splits() {
        let tree = r#"{"nodeid":0,"split":"total_sqft","split_condition":500,"yes":1,"no":2,"missing":1,
            "children":[
              {"nodeid":1,"split":"mean_crew","split_condition":2,"yes":3,"no":4,"missing":3,
               "children":[{"nodeid":3,"leaf":1.0},{"nodeid":4,"leaf":2.0}]},
              {"nodeid":2,"leaf":3.0}]}"#;
        let model = model(&[tree.to_string()], 0.0).unwrap();

        assert_eq!(model.predict(&row(100.0, 1.0)).unwrap(), 1.0);
        assert_eq!(model.predict(&row(100.0, 5.0)).unwrap(), 2.0);
        assert_eq!(model.predict(&row(900.0, 1.0)).unwrap(), 3.0);
    }

    #[test]
    fn rejects_schema_in_wrong_order() {
        let mut names = FEATURE_NAMES.to_vec();
        names.swap(0, 1);
        let json = format!(
            r#"{{"feature_names":{},"base_score":0,"trees":[{}]}}"#,
            serde_json::to_string(&names).unwrap(),
            stump("total_sqft", 1.0, 1.0, 2.0)
        );
        assert!(matches!(
            GbtModel::from_json(&json),
            Err(ModelError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn rejects_unknown_split_feature() {
        let err = model(&[stump("zip_code", 1.0, 1.0, 2.0)], 0.0).unwrap_err();
        assert!(matches!(err, ModelError::UnknownFeature { tree: 0, .. }));
    }

    #[test]
    fn rejects_reference_outside_children() {
        let tree = r#"{"nodeid":0,"split":"total_sqft","split_condition":1,"yes":1,"no":0,"missing":1,
            "children":[{"nodeid":1,"leaf":1.0}]}"#;
        let err = model(&[tree.to_string()], 0.0).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DanglingNode {
                node: 0,
                target: 0,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_finite_feature() {
        let model = model(&[stump("total_sqft", 1.0, 1.0, 2.0)], 0.0).unwrap();
        let err = model.predict(&row(f64::INFINITY, 0.0)).unwrap_err();
        assert_eq!(
            err,
            PredictionError::NonFiniteFeature {
                name: "total_sqft",
                value: f64::INFINITY
            }
        );
    }

    #[test]
    fn rejects_model_without_trees() {
        assert!(matches!(model(&[], 0.0), Err(ModelError::Empty)));
    }
}
