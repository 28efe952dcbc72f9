//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - built from form state on every submission
//! - handed to the classifier as one ordered feature row
//! - echoed back to the user (terminal table or JSON)

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Lower bound on income; keeps `loan_percent_income` defined.
pub const MIN_INCOME: i64 = 1;

/// Every column of the feature row, in the order the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PersonAge,
    PersonIncome,
    PersonHomeOwnership,
    PersonEmpLength,
    LoanIntent,
    LoanGrade,
    LoanAmnt,
    LoanIntRate,
    LoanPercentIncome,
    CbPersonDefaultOnFile,
    CbPersonCredHistLength,
}

/// How a feature's value is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Integer,
    Float,
    Categorical,
}

impl Feature {
    /// All features in model order (raw fields plus the derived ratio).
    pub const ALL: [Feature; 11] = [
        Feature::PersonAge,
        Feature::PersonIncome,
        Feature::PersonHomeOwnership,
        Feature::PersonEmpLength,
        Feature::LoanIntent,
        Feature::LoanGrade,
        Feature::LoanAmnt,
        Feature::LoanIntRate,
        Feature::LoanPercentIncome,
        Feature::CbPersonDefaultOnFile,
        Feature::CbPersonCredHistLength,
    ];

    /// Column name in the reference dataset and in the model's feature names.
    pub fn column(self) -> &'static str {
        match self {
            Feature::PersonAge => "person_age",
            Feature::PersonIncome => "person_income",
            Feature::PersonHomeOwnership => "person_home_ownership",
            Feature::PersonEmpLength => "person_emp_length",
            Feature::LoanIntent => "loan_intent",
            Feature::LoanGrade => "loan_grade",
            Feature::LoanAmnt => "loan_amnt",
            Feature::LoanIntRate => "loan_int_rate",
            Feature::LoanPercentIncome => "loan_percent_income",
            Feature::CbPersonDefaultOnFile => "cb_person_default_on_file",
            Feature::CbPersonCredHistLength => "cb_person_cred_hist_length",
        }
    }

    /// Human-facing widget label.
    pub fn label(self) -> &'static str {
        match self {
            Feature::PersonAge => "Person Age",
            Feature::PersonIncome => "Person Income",
            Feature::PersonHomeOwnership => "Home Ownership",
            Feature::PersonEmpLength => "Employment Length (Years)",
            Feature::LoanIntent => "Loan Intent",
            Feature::LoanGrade => "Loan Grade",
            Feature::LoanAmnt => "Loan Amount",
            Feature::LoanIntRate => "Loan Interest Rate",
            Feature::LoanPercentIncome => "Loan Percent Income",
            Feature::CbPersonDefaultOnFile => "Person Default on File",
            Feature::CbPersonCredHistLength => "Credit History Length",
        }
    }

    pub fn kind(self) -> FeatureKind {
        match self {
            Feature::PersonHomeOwnership
            | Feature::LoanIntent
            | Feature::LoanGrade
            | Feature::CbPersonDefaultOnFile => FeatureKind::Categorical,
            Feature::LoanIntRate | Feature::LoanPercentIncome => FeatureKind::Float,
            Feature::PersonAge
            | Feature::PersonIncome
            | Feature::PersonEmpLength
            | Feature::LoanAmnt
            | Feature::CbPersonCredHistLength => FeatureKind::Integer,
        }
    }

    pub fn from_column(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.column() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Errors raised while assembling an [`InputRecord`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("`{value}` is not a known {feature} (expected one of: {options})")]
    UnknownCategory {
        feature: Feature,
        value: String,
        options: String,
    },
    #[error("person_income must be at least {MIN_INCOME} (got {0})")]
    IncomeBelowMinimum(i64),
    #[error("{0} must not be negative")]
    Negative(Feature),
}

/// One category value together with its numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub value: String,
    pub code: u32,
}

/// The fixed set of values a categorical field may take.
///
/// Built from the reference dataset: `options` keeps first-seen order (what the
/// selector shows) while codes follow the sorted order a categorical dtype
/// assigns over the training column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDomain {
    feature: Feature,
    options: Vec<String>,
    sorted: Vec<String>,
}

impl CategoryDomain {
    /// Build a domain from observed values; duplicates are dropped, first
    /// occurrence wins.
    pub fn new<I, S>(feature: Feature, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options: Vec<String> = Vec::new();
        for value in observed {
            let value = value.into();
            if !options.contains(&value) {
                options.push(value);
            }
        }
        let mut sorted = options.clone();
        sorted.sort();
        Self {
            feature,
            options,
            sorted,
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Resolve a raw value to its category, rejecting anything unobserved.
    pub fn category(&self, value: &str) -> Result<Category, RecordError> {
        match self.sorted.binary_search_by(|known| known.as_str().cmp(value)) {
            Ok(idx) => Ok(Category {
                value: value.to_string(),
                code: idx as u32,
            }),
            Err(_) => Err(RecordError::UnknownCategory {
                feature: self.feature,
                value: value.to_string(),
                options: self.options.join(", "),
            }),
        }
    }
}

/// The four categorical domains the form needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDomains {
    pub home_ownership: CategoryDomain,
    pub loan_intent: CategoryDomain,
    pub loan_grade: CategoryDomain,
    pub default_on_file: CategoryDomain,
}

/// Raw values exactly as the user entered them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInputs {
    pub person_age: i64,
    pub person_income: i64,
    pub person_home_ownership: String,
    pub person_emp_length: i64,
    pub loan_intent: String,
    pub loan_grade: String,
    pub loan_amnt: i64,
    pub loan_int_rate: f64,
    pub cb_person_default_on_file: String,
    pub cb_person_cred_hist_length: i64,
}

/// One typed cell of the feature row.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Category(Category),
}

impl FeatureValue {
    /// Numeric value as seen by a tree model (categories map to their code).
    pub fn as_model_input(&self) -> f32 {
        match self {
            FeatureValue::Int(v) => *v as f32,
            FeatureValue::Float(v) => *v as f32,
            FeatureValue::Category(c) => c.code as f32,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => f.write_str(&fmt_float(*v)),
            FeatureValue::Category(c) => f.write_str(&c.value),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Int(v) => serializer.serialize_i64(*v),
            FeatureValue::Float(v) => serializer.serialize_f64(*v),
            FeatureValue::Category(c) => serializer.serialize_str(&c.value),
        }
    }
}

/// The feature row for one prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub person_age: i64,
    pub person_income: i64,
    pub person_home_ownership: Category,
    pub person_emp_length: i64,
    pub loan_intent: Category,
    pub loan_grade: Category,
    pub loan_amnt: i64,
    pub loan_int_rate: f64,
    pub loan_percent_income: f64,
    pub cb_person_default_on_file: Category,
    pub cb_person_cred_hist_length: i64,
}

impl InputRecord {
    /// Validate raw inputs, resolve categories and compute the derived ratio.
    pub fn from_raw(raw: &RawInputs, domains: &CategoryDomains) -> Result<Self, RecordError> {
        if raw.person_income < MIN_INCOME {
            return Err(RecordError::IncomeBelowMinimum(raw.person_income));
        }
        for (feature, value) in [
            (Feature::PersonAge, raw.person_age),
            (Feature::PersonEmpLength, raw.person_emp_length),
            (Feature::LoanAmnt, raw.loan_amnt),
            (Feature::CbPersonCredHistLength, raw.cb_person_cred_hist_length),
        ] {
            if value < 0 {
                return Err(RecordError::Negative(feature));
            }
        }
        if !(raw.loan_int_rate >= 0.0) {
            return Err(RecordError::Negative(Feature::LoanIntRate));
        }

        Ok(Self {
            person_age: raw.person_age,
            person_income: raw.person_income,
            person_home_ownership: domains.home_ownership.category(&raw.person_home_ownership)?,
            person_emp_length: raw.person_emp_length,
            loan_intent: domains.loan_intent.category(&raw.loan_intent)?,
            loan_grade: domains.loan_grade.category(&raw.loan_grade)?,
            loan_amnt: raw.loan_amnt,
            loan_int_rate: raw.loan_int_rate,
            loan_percent_income: raw.loan_amnt as f64 / raw.person_income as f64,
            cb_person_default_on_file: domains
                .default_on_file
                .category(&raw.cb_person_default_on_file)?,
            cb_person_cred_hist_length: raw.cb_person_cred_hist_length,
        })
    }

    pub fn value(&self, feature: Feature) -> FeatureValue {
        match feature {
            Feature::PersonAge => FeatureValue::Int(self.person_age),
            Feature::PersonIncome => FeatureValue::Int(self.person_income),
            Feature::PersonHomeOwnership => FeatureValue::Category(self.person_home_ownership.clone()),
            Feature::PersonEmpLength => FeatureValue::Int(self.person_emp_length),
            Feature::LoanIntent => FeatureValue::Category(self.loan_intent.clone()),
            Feature::LoanGrade => FeatureValue::Category(self.loan_grade.clone()),
            Feature::LoanAmnt => FeatureValue::Int(self.loan_amnt),
            Feature::LoanIntRate => FeatureValue::Float(self.loan_int_rate),
            Feature::LoanPercentIncome => FeatureValue::Float(self.loan_percent_income),
            Feature::CbPersonDefaultOnFile => {
                FeatureValue::Category(self.cb_person_default_on_file.clone())
            }
            Feature::CbPersonCredHistLength => FeatureValue::Int(self.cb_person_cred_hist_length),
        }
    }

    /// The full row in model order.
    pub fn features(&self) -> Vec<(Feature, FeatureValue)> {
        Feature::ALL.into_iter().map(|f| (f, self.value(f))).collect()
    }
}

impl Serialize for InputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Feature::ALL.len()))?;
        for (feature, value) in self.features() {
            map.serialize_entry(feature.column(), &value)?;
        }
        map.end()
    }
}

/// What a classifier returned for one row.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Prediction {
    /// A class label (0 = not approved, 1 = approved for the binary model).
    Class(u32),
    /// A raw score from a regression-style objective.
    Score(f64),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Class(c) => write!(f, "{c}"),
            Prediction::Score(s) => write!(f, "{s}"),
        }
    }
}

/// Format a float with at most four decimals and no trailing zeros.
pub fn fmt_float(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
