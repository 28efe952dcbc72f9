//! Fixtures shared by unit tests across modules.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::domain::{InputRecord, RawInputs};
use crate::form::FormSpec;
use crate::io::ReferenceDataset;

/// A small reference dataset with every column the form needs.
pub const REFERENCE_CSV: &str = "\
id,person_age,person_income,person_home_ownership,person_emp_length,loan_intent,loan_grade,loan_amnt,loan_int_rate,loan_percent_income,cb_person_default_on_file,cb_person_cred_hist_length,loan_status
0,37,35000,RENT,0.0,EDUCATION,B,6000,11.49,0.17,N,14,0
1,22,56000,OWN,6.0,MEDICAL,C,4000,13.35,0.07,N,2,0
2,29,28800,OWN,8.0,PERSONAL,A,6000,8.9,0.21,N,10,0
3,30,70000,RENT,14.0,VENTURE,B,12000,11.11,0.17,N,5,0
4,22,60000,RENT,2.0,MEDICAL,A,6000,6.92,0.1,N,3,0
5,27,45000,RENT,2.0,VENTURE,A,9000,8.94,0.2,N,3,0
6,25,45000,MORTGAGE,9.0,EDUCATION,A,12000,6.54,0.27,N,3,0
7,21,20000,RENT,0.0,PERSONAL,C,2500,13.49,0.13,Y,3,0
8,37,69600,RENT,11.0,EDUCATION,D,5000,14.84,0.07,N,11,0
9,35,110000,MORTGAGE,0.0,DEBTCONSOLIDATION,C,15000,12.98,0.14,Y,6,0
";

pub fn dataset() -> Arc<ReferenceDataset> {
    Arc::new(ReferenceDataset::from_reader(REFERENCE_CSV.as_bytes()).expect("fixture CSV parses"))
}

pub fn spec() -> FormSpec {
    FormSpec::derive(&dataset()).expect("fixture derives a form")
}

pub fn raw() -> RawInputs {
    RawInputs {
        person_age: 30,
        person_income: 60_000,
        person_home_ownership: "RENT".to_string(),
        person_emp_length: 4,
        loan_intent: "MEDICAL".to_string(),
        loan_grade: "B".to_string(),
        loan_amnt: 9_000,
        loan_int_rate: 10.5,
        cb_person_default_on_file: "N".to_string(),
        cb_person_cred_hist_length: 5,
    }
}

pub fn record() -> InputRecord {
    InputRecord::from_raw(&raw(), spec().domains()).expect("fixture record is valid")
}

/// Three-node stump: root splits feature 0 at 0.0, leaves -1.0 / 1.0, missing goes left.
pub fn stub_tree() -> Value {
    json!({
        "tree_param": {"num_nodes": "3", "size_leaf_vector": "1", "num_feature": "11", "num_deleted": "0"},
        "id": 0,
        "loss_changes": [1.0, 0.0, 0.0],
        "sum_hessian": [10.0, 5.0, 5.0],
        "base_weights": [0.0, -1.0, 1.0],
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "parents": [2147483647, 0, 0],
        "split_indices": [0, 0, 0],
        "split_conditions": [0.0, -1.0, 1.0],
        "split_type": [0, 0, 0],
        "default_left": [1, 0, 0],
        "categories": [],
        "categories_nodes": [],
        "categories_segments": [],
        "categories_sizes": []
    })
}

/// A single-leaf tree contributing `value` to its group.
pub fn leaf_tree(value: f32) -> Value {
    json!({
        "tree_param": {"num_nodes": "1", "size_leaf_vector": "1", "num_feature": "11", "num_deleted": "0"},
        "left_children": [-1],
        "right_children": [-1],
        "split_indices": [0],
        "split_conditions": [value],
        "default_left": [0]
    })
}

pub fn model_json(
    trees: Vec<Value>,
    tree_info: Vec<i32>,
    objective: &str,
    num_class: &str,
    feature_names: Vec<String>,
) -> String {
    let num_feature = if feature_names.is_empty() { 11 } else { feature_names.len() };
    let n_trees = trees.len();
    json!({
        "version": [2, 1, 0],
        "learner": {
            "attributes": {},
            "feature_names": feature_names,
            "feature_types": [],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": {"num_trees": n_trees.to_string(), "num_parallel_tree": "1"},
                    "trees": trees,
                    "tree_info": tree_info
                }
            },
            "objective": {"name": objective, "reg_loss_param": {"scale_pos_weight": "1"}},
            "learner_model_param": {
                "base_score": "5E-1",
                "num_class": num_class,
                "num_feature": num_feature.to_string(),
                "num_target": "1",
                "boost_from_average": "1"
            }
        }
    })
    .to_string()
}

/// Binary logistic stump on `feature` at `threshold`.
pub fn binary_model_json(feature: i32, threshold: f32, left: f32, right: f32) -> String {
    let mut tree = stub_tree();
    tree["split_indices"] = json!([feature, 0, 0]);
    tree["split_conditions"] = json!([threshold, left, right]);
    model_json(vec![tree], vec![0], "binary:logistic", "0", vec![])
}
