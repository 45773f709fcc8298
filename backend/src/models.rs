use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::knowledge::AdvisoryEntry;

/// Crops the classifier was trained on. Order is the selector order and the
/// ordinal encoding of the categorical `Crop` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crop {
    Tomato,
    Potato,
    Rice,
    Wheat,
    Maize,
    Cotton,
    Sugarcane,
    Apple,
    Groundnut,
    Mango,
}

impl Crop {
    pub const ALL: [Crop; 10] = [
        Crop::Tomato,
        Crop::Potato,
        Crop::Rice,
        Crop::Wheat,
        Crop::Maize,
        Crop::Cotton,
        Crop::Sugarcane,
        Crop::Apple,
        Crop::Groundnut,
        Crop::Mango,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Crop::Tomato => "Tomato",
            Crop::Potato => "Potato",
            Crop::Rice => "Rice",
            Crop::Wheat => "Wheat",
            Crop::Maize => "Maize",
            Crop::Cotton => "Cotton",
            Crop::Sugarcane => "Sugarcane",
            Crop::Apple => "Apple",
            Crop::Groundnut => "Groundnut",
            Crop::Mango => "Mango",
        }
    }

    pub fn from_name(name: &str) -> Option<Crop> {
        Crop::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Crop::ALL.iter().map(Crop::as_str).collect()
    }
}

impl Default for Crop {
    fn default() -> Self {
        Crop::ALL[0]
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded numeric control: the slider range and its starting value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericDomain {
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl NumericDomain {
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Widget semantics: non-finite input takes the default, anything else is clamped.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

pub const TEMPERATURE: NumericDomain = NumericDomain {
    label: "Temperature (°C)",
    min: 10.0,
    max: 50.0,
    default: 25.0,
};
pub const HUMIDITY: NumericDomain = NumericDomain {
    label: "Humidity (%)",
    min: 10.0,
    max: 100.0,
    default: 50.0,
};
pub const RAINFALL: NumericDomain = NumericDomain {
    label: "Rainfall (mm)",
    min: 0.0,
    max: 500.0,
    default: 150.0,
};
pub const SOIL_PH: NumericDomain = NumericDomain {
    label: "Soil pH",
    min: 3.0,
    max: 10.0,
    default: 6.5,
};
pub const SOIL_MOISTURE: NumericDomain = NumericDomain {
    label: "Soil Moisture (%)",
    min: 0.0,
    max: 100.0,
    default: 40.0,
};

/// Column names exactly as the classifier was trained on them, in input order.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "Crop",
    "Temperature(C)",
    "Humidity(%)",
    "Rainfall(mm)",
    "Soil_pH",
    "Soil_Moisture(%)",
    "Leaf_Spots",
    "Wilting",
];

/// Columns the classifier treats as categorical.
pub const CATEGORICAL_FEATURES: [&str; 1] = ["Crop"];

/// One submission of the form. Built per request and never mutated afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PredictionRequest {
    pub crop: Crop,
    pub temperature: f32,
    pub humidity: f32,
    pub rainfall: f32,
    pub soil_ph: f32,
    pub soil_moisture: f32,
    pub leaf_spots: bool,
    pub wilting: bool,
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self {
            crop: Crop::default(),
            temperature: TEMPERATURE.default,
            humidity: HUMIDITY.default,
            rainfall: RAINFALL.default,
            soil_ph: SOIL_PH.default,
            soil_moisture: SOIL_MOISTURE.default,
            leaf_spots: false,
            wilting: false,
        }
    }
}

impl PredictionRequest {
    fn numeric_fields(&self) -> [(NumericDomain, f32); 5] {
        [
            (TEMPERATURE, self.temperature),
            (HUMIDITY, self.humidity),
            (RAINFALL, self.rainfall),
            (SOIL_PH, self.soil_ph),
            (SOIL_MOISTURE, self.soil_moisture),
        ]
    }

    /// Checks every numeric field against its control domain. Requests coming
    /// through the JSON API are not bounded by widgets.
    pub fn validate(&self) -> Result<(), String> {
        for (domain, value) in self.numeric_fields().iter() {
            if !domain.contains(*value) {
                return Err(format!(
                    "{} must be between {} and {} (got {})",
                    domain.label, domain.min, domain.max, value
                ));
            }
        }

        Ok(())
    }

    /// Single-row record in the classifier's column layout. Flags become 0/1.
    pub fn to_feature_row(&self) -> FeatureRow {
        let values = [
            FeatureValue::Categorical(self.crop.as_str().to_string()),
            FeatureValue::Float(self.temperature),
            FeatureValue::Float(self.humidity),
            FeatureValue::Float(self.rainfall),
            FeatureValue::Float(self.soil_ph),
            FeatureValue::Float(self.soil_moisture),
            FeatureValue::Flag(u8::from(self.leaf_spots)),
            FeatureValue::Flag(u8::from(self.wilting)),
        ];

        FeatureRow {
            columns: FEATURE_COLUMNS.iter().copied().zip(values).collect(),
            categorical: &CATEGORICAL_FEATURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Categorical(String),
    Float(f32),
    Flag(u8),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Categorical(s) => f.write_str(s),
            FeatureValue::Float(v) => write!(f, "{:?}", v),
            FeatureValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Categorical(s) => serializer.serialize_str(s),
            FeatureValue::Float(v) => serializer.serialize_f32(*v),
            FeatureValue::Flag(v) => serializer.serialize_u8(*v),
        }
    }
}

/// The exact record handed to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(&'static str, FeatureValue)>,
    categorical: &'static [&'static str],
}

impl FeatureRow {
    pub fn columns(&self) -> &[(&'static str, FeatureValue)] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn categorical_columns(&self) -> &'static [&'static str] {
        self.categorical
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// Serialized as an ordered object keyed by column name.
impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Disease name decoded from the classifier's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DiseaseLabel(String);

impl DiseaseLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label joined with its advisory and the record that produced it.
#[derive(Debug, Serialize, Clone)]
pub struct PredictionOutcome {
    pub disease: DiseaseLabel,
    pub known_disease: bool,
    pub advisory: AdvisoryEntry,
    pub crop: Crop,
    pub features: FeatureRow,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn timed(mut self, elapsed_ms: u64) -> Self {
        self.execution_time_ms = Some(elapsed_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tomato_request() -> PredictionRequest {
        PredictionRequest::default()
    }

    #[test]
    fn default_request_matches_control_defaults() {
        let req = tomato_request();
        assert_eq!(req.crop, Crop::Tomato);
        assert_eq!(req.temperature, 25.0);
        assert_eq!(req.humidity, 50.0);
        assert_eq!(req.rainfall, 150.0);
        assert_eq!(req.soil_ph, 6.5);
        assert_eq!(req.soil_moisture, 40.0);
        assert!(!req.leaf_spots);
        assert!(!req.wilting);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn feature_row_uses_training_column_names() {
        let row = tomato_request().to_feature_row();
        let names: Vec<&str> = row.columns().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURE_COLUMNS.to_vec());
        assert_eq!(row.categorical_columns(), &["Crop"]);
        assert!(row.is_categorical("Crop"));
        assert!(!row.is_categorical("Soil_pH"));
    }

    #[test]
    fn flags_encode_as_integers() {
        let mut req = tomato_request();
        req.leaf_spots = true;
        let row = req.to_feature_row();
        assert_eq!(row.get("Leaf_Spots"), Some(&FeatureValue::Flag(1)));
        assert_eq!(row.get("Wilting"), Some(&FeatureValue::Flag(0)));
    }

    #[test]
    fn feature_row_serializes_as_ordered_object() {
        let json = serde_json::to_string(&tomato_request().to_feature_row()).unwrap();
        assert_eq!(
            json,
            r#"{"Crop":"Tomato","Temperature(C)":25.0,"Humidity(%)":50.0,"Rainfall(mm)":150.0,"Soil_pH":6.5,"Soil_Moisture(%)":40.0,"Leaf_Spots":0,"Wilting":0}"#
        );
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut req = tomato_request();
        req.soil_ph = 11.0;
        let err = req.validate().unwrap_err();
        assert!(err.contains("Soil pH"), "{err}");

        let mut req = tomato_request();
        req.rainfall = -1.0;
        assert!(req.validate().is_err());

        let mut req = tomato_request();
        req.humidity = f32::NAN;
        assert!(req.validate().is_err());
    }

    #[test]
    fn domain_clamp_follows_slider_bounds() {
        assert_eq!(TEMPERATURE.clamp(80.0), 50.0);
        assert_eq!(TEMPERATURE.clamp(-3.0), 10.0);
        assert_eq!(TEMPERATURE.clamp(31.5), 31.5);
        assert_eq!(RAINFALL.clamp(f32::INFINITY), RAINFALL.default);
    }

    #[test]
    fn crop_names_round_trip_through_selector_order() {
        assert_eq!(Crop::names().len(), 10);
        assert_eq!(Crop::names()[0], "Tomato");
        assert_eq!(Crop::from_name("Groundnut"), Some(Crop::Groundnut));
        assert_eq!(Crop::from_name("Banana"), None);
    }

    #[test]
    fn json_request_uses_snake_case_fields() {
        let req: PredictionRequest = serde_json::from_str(
            r#"{"crop":"Rice","temperature":30.0,"humidity":80.0,"rainfall":200.0,
                "soil_ph":5.5,"soil_moisture":60.0,"leaf_spots":true,"wilting":false}"#,
        )
        .unwrap();
        assert_eq!(req.crop, Crop::Rice);
        assert!(req.leaf_spots);
    }
}
