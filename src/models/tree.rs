//! Decision-tree ensembles: random forests and gradient-boosted trees.
//!
//! Trees are stored as flat node arrays. A split sends a row left when
//! `row[feature] <= threshold`. Children always point forward in the array,
//! which validation enforces so evaluation terminates.

use super::{margin_probability, Classifier};
use crate::error::{ShieldError, ShieldResult};
use serde::{Deserialize, Serialize};

/// One node of a flat tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

/// A single decision tree, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Structural validation against the model input width
    pub fn validate(&self, width: usize) -> ShieldResult<()> {
        if self.nodes.is_empty() {
            return Err(ShieldError::artifact("tree has no nodes"));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= width {
                        return Err(ShieldError::artifact(format!(
                            "node {} splits on feature {} but the model has {} features",
                            idx, feature, width
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ShieldError::artifact(format!(
                            "node {} has a NaN threshold",
                            idx
                        )));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ShieldError::artifact(format!(
                                "node {} has child {} outside ({}, {})",
                                idx,
                                child,
                                idx,
                                self.nodes.len()
                            )));
                        }
                    }
                }
                TreeNode::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(ShieldError::artifact(format!(
                            "node {} has a non-finite leaf value",
                            idx
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Walk the tree for one row and return the leaf value.
    ///
    /// Assumes `validate` passed for a width no larger than `row.len()`.
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn leaves(&self) -> impl Iterator<Item = f64> + '_ {
        self.nodes.iter().filter_map(|n| match n {
            TreeNode::Leaf { leaf } => Some(*leaf),
            TreeNode::Split { .. } => None,
        })
    }
}

/// Random forest: each leaf holds a fraud probability, the forest averages them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    pub trees: Vec<DecisionTree>,
    #[serde(skip)]
    width: usize,
}

impl RandomForestModel {
    pub fn new(trees: Vec<DecisionTree>, width: usize) -> ShieldResult<Self> {
        let mut model = Self { trees, width: 0 };
        model.validate(width)?;
        Ok(model)
    }

    /// Validate trees and fix the input width
    pub fn validate(&mut self, width: usize) -> ShieldResult<()> {
        if self.trees.is_empty() {
            return Err(ShieldError::artifact("random forest has no trees"));
        }
        for tree in &self.trees {
            tree.validate(width)?;
            if tree.leaves().any(|p| !(0.0..=1.0).contains(&p)) {
                return Err(ShieldError::artifact(
                    "random forest leaves must hold probabilities in [0, 1]",
                ));
            }
        }
        self.width = width;
        Ok(())
    }
}

impl Classifier for RandomForestModel {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn input_width(&self) -> usize {
        self.width
    }

    fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
        let n_trees = self.trees.len() as f64;
        rows.iter()
            .map(|row| {
                check_width(row, self.width)?;
                let total: f64 = self.trees.iter().map(|t| t.evaluate(row)).sum();
                Ok((total / n_trees).clamp(0.0, 1.0))
            })
            .collect()
    }
}

/// Gradient-boosted trees: leaves hold log-odds contributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    /// Initial log-odds before any tree
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<DecisionTree>,
    #[serde(skip)]
    width: usize,
}

impl GradientBoostedModel {
    pub fn new(base_score: f64, trees: Vec<DecisionTree>, width: usize) -> ShieldResult<Self> {
        let mut model = Self {
            base_score,
            trees,
            width: 0,
        };
        model.validate(width)?;
        Ok(model)
    }

    pub fn validate(&mut self, width: usize) -> ShieldResult<()> {
        if !self.base_score.is_finite() {
            return Err(ShieldError::artifact("base_score must be finite"));
        }
        if self.trees.is_empty() {
            return Err(ShieldError::artifact("gradient-boosted model has no trees"));
        }
        for tree in &self.trees {
            tree.validate(width)?;
        }
        self.width = width;
        Ok(())
    }
}

impl Classifier for GradientBoostedModel {
    fn kind(&self) -> &'static str {
        "gradient_boosted"
    }

    fn input_width(&self) -> usize {
        self.width
    }

    fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
        rows.iter()
            .map(|row| {
                check_width(row, self.width)?;
                let margin: f64 =
                    self.base_score + self.trees.iter().map(|t| t.evaluate(row)).sum::<f64>();
                margin_probability(margin)
            })
            .collect()
    }
}

fn check_width(row: &[f64], width: usize) -> ShieldResult<()> {
    if row.len() != width {
        return Err(ShieldError::invalid(format!(
            "row has {} features, model expects {}",
            row.len(),
            width
        )));
    }
    Ok(())
}
