//! Input collection: widget bounds derived from the reference dataset, the
//! editable form state, and assembly of the feature row on submit.
//!
//! The form is rendered by a pure function of `(spec, state, submitted)`:
//! edits only touch [`FormState`]; nothing downstream sees them until the
//! caller passes `submitted = true`.

use crate::domain::{
    CategoryDomain, CategoryDomains, Feature, FeatureKind, InputRecord, MIN_INCOME, RawInputs,
    RecordError, fmt_float,
};
use crate::io::{DatasetError, ReferenceDataset};

/// Sliders never end below these values, however narrow the sample data is.
pub const AGE_SLIDER_FLOOR: i64 = 100;
pub const EMP_LENGTH_SLIDER_FLOOR: i64 = 65;

const INT_STEP: i64 = 1;
const FLOAT_STEP: f64 = 0.01;

/// What kind of widget a field renders as, with its bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    Slider { min: i64, max: i64 },
    IntInput { min: i64 },
    FloatInput { min: f64 },
    Select { domain: CategoryDomain },
}

/// A widget's current (or default) value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidgetValue {
    Int(i64),
    Float(f64),
    /// Index into the select's options.
    Choice(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub feature: Feature,
    pub kind: WidgetKind,
    pub default: WidgetValue,
}

impl Widget {
    pub fn label(&self) -> &'static str {
        self.feature.label()
    }

    /// Inclusive numeric range; `None` upper bound means unbounded.
    pub fn bounds(&self) -> Option<(f64, Option<f64>)> {
        match &self.kind {
            WidgetKind::Slider { min, max } => Some((*min as f64, Some(*max as f64))),
            WidgetKind::IntInput { min } => Some((*min as f64, None)),
            WidgetKind::FloatInput { min } => Some((*min, None)),
            WidgetKind::Select { .. } => None,
        }
    }

    /// Render a value the way the widget shows it.
    pub fn format_value(&self, value: WidgetValue) -> String {
        match (value, &self.kind) {
            (WidgetValue::Int(v), _) => v.to_string(),
            (WidgetValue::Float(v), _) => fmt_float(v),
            (WidgetValue::Choice(i), WidgetKind::Select { domain }) => {
                domain.options().get(i).cloned().unwrap_or_default()
            }
            (WidgetValue::Choice(_), _) => String::new(),
        }
    }

    /// Short description of the widget's range or options.
    pub fn describe(&self) -> String {
        match &self.kind {
            WidgetKind::Slider { min, max } => format!("slider {min}..={max}"),
            WidgetKind::IntInput { min } => format!("number >= {min}"),
            WidgetKind::FloatInput { min } => format!("number >= {}", fmt_float(*min)),
            WidgetKind::Select { domain } => format!("one of {}", domain.options().join(" | ")),
        }
    }
}

/// Errors from editing a single field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("'{value}' is not a valid number for {label}")]
    Parse { label: &'static str, value: String },
    #[error("{label} must be between {min} and {max} (got {value})")]
    OutOfRange {
        label: &'static str,
        min: String,
        max: String,
        value: String,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Every widget of the form, derived once from the reference dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSpec {
    widgets: Vec<Widget>,
    domains: CategoryDomains,
}

impl FormSpec {
    /// Compute bounds, defaults and options for the ten raw fields.
    pub fn derive(data: &ReferenceDataset) -> Result<Self, DatasetError> {
        let home_ownership = select_domain(data, Feature::PersonHomeOwnership)?;
        let loan_intent = select_domain(data, Feature::LoanIntent)?;
        let loan_grade = select_domain(data, Feature::LoanGrade)?;
        let default_on_file = select_domain(data, Feature::CbPersonDefaultOnFile)?;

        let widgets = vec![
            slider(data, Feature::PersonAge, AGE_SLIDER_FLOOR)?,
            int_input(data, Feature::PersonIncome, MIN_INCOME)?,
            select(&home_ownership),
            slider(data, Feature::PersonEmpLength, EMP_LENGTH_SLIDER_FLOOR)?,
            select(&loan_intent),
            select(&loan_grade),
            int_input(data, Feature::LoanAmnt, 0)?,
            float_input(data, Feature::LoanIntRate, 0.0)?,
            select(&default_on_file),
            int_input(data, Feature::CbPersonCredHistLength, 0)?,
        ];

        for w in &widgets {
            tracing::debug!(field = %w.feature, widget = %w.describe(), default = %w.format_value(w.default), "derived widget");
        }

        Ok(Self {
            widgets,
            domains: CategoryDomains {
                home_ownership,
                loan_intent,
                loan_grade,
                default_on_file,
            },
        })
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn domains(&self) -> &CategoryDomains {
        &self.domains
    }

    pub fn widget(&self, feature: Feature) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.feature == feature)
    }

    fn index_of(&self, feature: Feature) -> Option<usize> {
        self.widgets.iter().position(|w| w.feature == feature)
    }
}

fn slider(data: &ReferenceDataset, feature: Feature, floor_max: i64) -> Result<Widget, DatasetError> {
    let stats = data.numeric_stats(feature.column())?;
    let min = stats.min.floor() as i64;
    let max = (stats.max.floor() as i64).max(floor_max);
    let default = (stats.median.round() as i64).clamp(min, max);
    Ok(Widget {
        feature,
        kind: WidgetKind::Slider { min, max },
        default: WidgetValue::Int(default),
    })
}

fn int_input(data: &ReferenceDataset, feature: Feature, min: i64) -> Result<Widget, DatasetError> {
    let stats = data.numeric_stats(feature.column())?;
    let default = (stats.median.round() as i64).max(min);
    Ok(Widget {
        feature,
        kind: WidgetKind::IntInput { min },
        default: WidgetValue::Int(default),
    })
}

fn float_input(data: &ReferenceDataset, feature: Feature, min: f64) -> Result<Widget, DatasetError> {
    let stats = data.numeric_stats(feature.column())?;
    Ok(Widget {
        feature,
        kind: WidgetKind::FloatInput { min },
        default: WidgetValue::Float(stats.median.max(min)),
    })
}

fn select_domain(data: &ReferenceDataset, feature: Feature) -> Result<CategoryDomain, DatasetError> {
    Ok(CategoryDomain::new(feature, data.unique(feature.column())?))
}

fn select(domain: &CategoryDomain) -> Widget {
    Widget {
        feature: domain.feature(),
        kind: WidgetKind::Select {
            domain: domain.clone(),
        },
        default: WidgetValue::Choice(0),
    }
}

/// The values currently shown in the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: Vec<WidgetValue>,
}

impl FormState {
    /// Seed every widget with its default.
    pub fn from_spec(spec: &FormSpec) -> Self {
        Self {
            values: spec.widgets.iter().map(|w| w.default).collect(),
        }
    }

    pub fn value(&self, idx: usize) -> Option<WidgetValue> {
        self.values.get(idx).copied()
    }

    /// Move the widget at `idx` by `delta` steps (cycling for selects).
    pub fn step(&mut self, spec: &FormSpec, idx: usize, delta: i64) {
        let (Some(widget), Some(value)) = (spec.widgets.get(idx), self.values.get_mut(idx)) else {
            return;
        };
        *value = match (&widget.kind, *value) {
            (WidgetKind::Slider { min, max }, WidgetValue::Int(v)) => {
                WidgetValue::Int(v.saturating_add(delta * INT_STEP).clamp(*min, *max))
            }
            (WidgetKind::IntInput { min }, WidgetValue::Int(v)) => {
                WidgetValue::Int(v.saturating_add(delta * INT_STEP).max(*min))
            }
            (WidgetKind::FloatInput { min }, WidgetValue::Float(v)) => {
                let next = v + delta as f64 * FLOAT_STEP;
                WidgetValue::Float(((next * 1e6).round() / 1e6).max(*min))
            }
            (WidgetKind::Select { domain }, WidgetValue::Choice(i)) => {
                let n = domain.options().len().max(1) as i64;
                WidgetValue::Choice((i as i64 + delta).rem_euclid(n) as usize)
            }
            (_, other) => other,
        };
    }

    /// Set the widget at `idx` from text (a number, or an option for selects).
    pub fn set_text(&mut self, spec: &FormSpec, idx: usize, text: &str) -> Result<(), FormError> {
        let Some(widget) = spec.widgets.get(idx) else {
            return Ok(());
        };
        let text = text.trim();
        let label = widget.label();
        let parse_err = || FormError::Parse {
            label,
            value: text.to_string(),
        };

        let next = match &widget.kind {
            WidgetKind::Slider { min, max } => {
                let v = text.parse::<i64>().map_err(|_| parse_err())?;
                if v < *min || v > *max {
                    return Err(out_of_range(label, *min, Some(*max), v));
                }
                WidgetValue::Int(v)
            }
            WidgetKind::IntInput { min } => {
                let v = text.parse::<i64>().map_err(|_| parse_err())?;
                if v < *min {
                    return Err(out_of_range(label, *min, None, v));
                }
                WidgetValue::Int(v)
            }
            WidgetKind::FloatInput { min } => {
                let v = text.parse::<f64>().map_err(|_| parse_err())?;
                if !v.is_finite() {
                    return Err(parse_err());
                }
                if v < *min {
                    return Err(FormError::OutOfRange {
                        label,
                        min: fmt_float(*min),
                        max: "inf".to_string(),
                        value: fmt_float(v),
                    });
                }
                WidgetValue::Float(v)
            }
            WidgetKind::Select { domain } => {
                // Validates against the domain and produces the standard error.
                domain.category(text)?;
                let pos = domain.options().iter().position(|o| o == text).unwrap_or(0);
                WidgetValue::Choice(pos)
            }
        };
        self.values[idx] = next;
        Ok(())
    }

    /// Set a field by feature rather than by position.
    pub fn set_field(&mut self, spec: &FormSpec, feature: Feature, text: &str) -> Result<(), FormError> {
        match spec.index_of(feature) {
            Some(idx) => self.set_text(spec, idx, text),
            None => Ok(()),
        }
    }

    /// Snapshot the raw values in form order.
    pub fn raw_inputs(&self, spec: &FormSpec) -> RawInputs {
        let int = |f: Feature| match spec.index_of(f).and_then(|i| self.value(i)) {
            Some(WidgetValue::Int(v)) => v,
            _ => 0,
        };
        let float = |f: Feature| match spec.index_of(f).and_then(|i| self.value(i)) {
            Some(WidgetValue::Float(v)) => v,
            _ => 0.0,
        };
        let choice = |f: Feature| match (spec.widget(f), spec.index_of(f).and_then(|i| self.value(i))) {
            (Some(w), Some(v)) => w.format_value(v),
            _ => String::new(),
        };

        RawInputs {
            person_age: int(Feature::PersonAge),
            person_income: int(Feature::PersonIncome),
            person_home_ownership: choice(Feature::PersonHomeOwnership),
            person_emp_length: int(Feature::PersonEmpLength),
            loan_intent: choice(Feature::LoanIntent),
            loan_grade: choice(Feature::LoanGrade),
            loan_amnt: int(Feature::LoanAmnt),
            loan_int_rate: float(Feature::LoanIntRate),
            cb_person_default_on_file: choice(Feature::CbPersonDefaultOnFile),
            cb_person_cred_hist_length: int(Feature::CbPersonCredHistLength),
        }
    }
}

fn out_of_range(label: &'static str, min: i64, max: Option<i64>, value: i64) -> FormError {
    FormError::OutOfRange {
        label,
        min: min.to_string(),
        max: max.map(|m| m.to_string()).unwrap_or_else(|| "inf".to_string()),
        value: value.to_string(),
    }
}

/// Output of the collector for one pass over the form.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub record: InputRecord,
    pub submitted: bool,
}

/// Assemble the feature row from the current form values.
pub fn collect(spec: &FormSpec, state: &FormState, submitted: bool) -> Result<Collected, RecordError> {
    let raw = state.raw_inputs(spec);
    let record = InputRecord::from_raw(&raw, spec.domains())?;
    Ok(Collected { record, submitted })
}

/// One widget as the front-end draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub label: &'static str,
    pub value: String,
    pub hint: String,
    pub kind: FeatureKind,
}

/// Everything one pass of the flow renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub widgets: Vec<WidgetView>,
    /// Present only when the pass was a submission.
    pub record: Option<InputRecord>,
}

/// Render the form and, on submission, the assembled record.
pub fn render(spec: &FormSpec, state: &FormState, submitted: bool) -> Result<Rendered, RecordError> {
    let widgets = spec
        .widgets
        .iter()
        .enumerate()
        .map(|(idx, w)| WidgetView {
            label: w.label(),
            value: state.value(idx).map(|v| w.format_value(v)).unwrap_or_default(),
            hint: w.describe(),
            kind: w.feature.kind(),
        })
        .collect();

    let record = if submitted {
        Some(collect(spec, state, submitted)?.record)
    } else {
        None
    };

    Ok(Rendered { widgets, record })
}
