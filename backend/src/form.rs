//! Side-panel controls and parsing of their submitted values.
//!
//! Parsing re-applies what the widgets guarantee in the browser: unknown or
//! malformed values take the control default and numbers are clamped into the
//! slider range, so every parsed form yields a request inside the domains.

use serde::Deserialize;

use crate::models::{
    Crop, NumericDomain, PredictionRequest, HUMIDITY, RAINFALL, SOIL_MOISTURE, SOIL_PH,
    TEMPERATURE,
};

/// Name of the submit trigger field. Its presence alone means "predict".
pub const SUBMIT_FIELD: &str = "predict";

/// A slider in the side panel.
#[derive(Debug, Clone, Copy)]
pub struct Slider {
    pub name: &'static str,
    pub icon: &'static str,
    pub domain: NumericDomain,
    pub step: f32,
}

pub const ENVIRONMENT_SLIDERS: [Slider; 3] = [
    Slider {
        name: "temperature",
        icon: "🌡",
        domain: TEMPERATURE,
        step: 0.1,
    },
    Slider {
        name: "humidity",
        icon: "💧",
        domain: HUMIDITY,
        step: 0.1,
    },
    Slider {
        name: "rainfall",
        icon: "🌧",
        domain: RAINFALL,
        step: 0.1,
    },
];

pub const SOIL_SLIDERS: [Slider; 2] = [
    Slider {
        name: "soil_ph",
        icon: "🧪",
        domain: SOIL_PH,
        step: 0.1,
    },
    Slider {
        name: "soil_moisture",
        icon: "💦",
        domain: SOIL_MOISTURE,
        step: 0.1,
    },
];

/// A two-option radio group.
#[derive(Debug, Clone, Copy)]
pub struct Toggle {
    pub name: &'static str,
    pub label: &'static str,
}

pub const SYMPTOM_TOGGLES: [Toggle; 2] = [
    Toggle {
        name: "leaf_spots",
        label: "🍂 Visible Leaf Spots?",
    },
    Toggle {
        name: "wilting",
        label: "🥀 Plant Wilting?",
    },
];

/// Raw submitted values, as they arrive from a query string or form body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawForm {
    pub crop: Option<String>,
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub rainfall: Option<String>,
    pub soil_ph: Option<String>,
    pub soil_moisture: Option<String>,
    pub leaf_spots: Option<String>,
    pub wilting: Option<String>,
    pub predict: Option<String>,
}

/// Snapshot of every control plus the submit trigger.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormInput {
    pub request: PredictionRequest,
    pub submitted: bool,
}

impl FormInput {
    pub fn from_raw(raw: &RawForm) -> Self {
        let crop = raw
            .crop
            .as_deref()
            .and_then(Crop::from_name)
            .unwrap_or_default();

        let request = PredictionRequest {
            crop,
            temperature: parse_slider(raw.temperature.as_deref(), &TEMPERATURE),
            humidity: parse_slider(raw.humidity.as_deref(), &HUMIDITY),
            rainfall: parse_slider(raw.rainfall.as_deref(), &RAINFALL),
            soil_ph: parse_slider(raw.soil_ph.as_deref(), &SOIL_PH),
            soil_moisture: parse_slider(raw.soil_moisture.as_deref(), &SOIL_MOISTURE),
            leaf_spots: parse_yes_no(raw.leaf_spots.as_deref()),
            wilting: parse_yes_no(raw.wilting.as_deref()),
        };

        Self {
            request,
            submitted: raw.predict.is_some(),
        }
    }

    /// Current value of a slider, by field name.
    pub fn slider_value(&self, name: &str) -> Option<f32> {
        let r = &self.request;
        match name {
            "temperature" => Some(r.temperature),
            "humidity" => Some(r.humidity),
            "rainfall" => Some(r.rainfall),
            "soil_ph" => Some(r.soil_ph),
            "soil_moisture" => Some(r.soil_moisture),
            _ => None,
        }
    }

    pub fn toggle_value(&self, name: &str) -> Option<bool> {
        match name {
            "leaf_spots" => Some(self.request.leaf_spots),
            "wilting" => Some(self.request.wilting),
            _ => None,
        }
    }
}

fn parse_slider(raw: Option<&str>, domain: &NumericDomain) -> f32 {
    raw.and_then(|v| v.trim().parse::<f32>().ok())
        .map(|v| domain.clamp(v))
        .unwrap_or(domain.default)
}

fn parse_yes_no(raw: Option<&str>) -> bool {
    raw == Some("Yes")
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
