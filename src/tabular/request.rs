//! Request schema for the tabular classifier.
//!
//! Three fields are required (`glucose`, `bmi`, `age`) and must be present in
//! the body. The remaining five default to zero when absent or `null`. Numbers
//! are accepted either as JSON numbers or as numeric strings.

use serde::{Deserialize, Serialize};

/// Number of features the tabular model consumes.
pub const FEATURE_COUNT: usize = 8;

/// Wire names of the features, in model input order.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "pregnancies",
    "glucose",
    "bloodPressure",
    "skinThickness",
    "insulin",
    "bmi",
    "diabetesPedigreeFunction",
    "age",
];

/// Body of `POST /api/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularRequest {
    #[serde(default, deserialize_with = "lenient::optional")]
    pub pregnancies: Option<f64>,
    #[serde(deserialize_with = "lenient::required")]
    pub glucose: f64,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub blood_pressure: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub skin_thickness: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub insulin: Option<f64>,
    #[serde(deserialize_with = "lenient::required")]
    pub bmi: f64,
    #[serde(default, deserialize_with = "lenient::optional")]
    pub diabetes_pedigree_function: Option<f64>,
    #[serde(deserialize_with = "lenient::required")]
    pub age: f64,
}

impl TabularRequest {
    /// Request with only the required fields set.
    pub fn new(glucose: f64, bmi: f64, age: f64) -> Self {
        Self {
            pregnancies: None,
            glucose,
            blood_pressure: None,
            skin_thickness: None,
            insulin: None,
            bmi,
            diabetes_pedigree_function: None,
            age,
        }
    }

    /// Resolve optional fields to their defaults.
    pub fn features(&self) -> FeatureRow {
        FeatureRow {
            pregnancies: self.pregnancies.unwrap_or(0.0),
            glucose: self.glucose,
            blood_pressure: self.blood_pressure.unwrap_or(0.0),
            skin_thickness: self.skin_thickness.unwrap_or(0.0),
            insulin: self.insulin.unwrap_or(0.0),
            bmi: self.bmi,
            diabetes_pedigree_function: self.diabetes_pedigree_function.unwrap_or(0.0),
            age: self.age,
        }
    }
}

/// Fully resolved feature values, as stored in the prediction log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub pregnancies: f64,
    pub glucose: f64,
    pub blood_pressure: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    pub bmi: f64,
    pub diabetes_pedigree_function: f64,
    pub age: f64,
}

impl FeatureRow {
    /// Values in [`FEATURE_ORDER`].
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.pregnancies as f32,
            self.glucose as f32,
            self.blood_pressure as f32,
            self.skin_thickness as f32,
            self.insulin as f32,
            self.bmi as f32,
            self.diabetes_pedigree_function as f32,
            self.age as f32,
        ]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [pregnancies, glucose, blood_pressure, skin_thickness, insulin, bmi, pedigree, age] =
            values;
        Self {
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree_function: pedigree,
            age,
        }
    }
}

mod lenient {
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use std::fmt;

    struct NumberVisitor;

    impl<'de> Visitor<'de> for NumberVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a finite number or numeric string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            if v.is_finite() {
                Ok(v)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(n),
                _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }
    }

    struct OptionalNumberVisitor;

    impl<'de> Visitor<'de> for OptionalNumberVisitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a finite number, numeric string or null")
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<f64>, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(
            self,
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            required(deserializer).map(Some)
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }

    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        deserializer.deserialize_option(OptionalNumberVisitor)
    }
}
