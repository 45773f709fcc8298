//! Server-side rendering of the single page: side panel controls on the left,
//! idle prompt, failure banner or prediction result on the right.

use std::fmt::Write;

use crate::form::{
    yes_no, FormInput, Slider, ENVIRONMENT_SLIDERS, SOIL_SLIDERS, SUBMIT_FIELD, SYMPTOM_TOGGLES,
};
use crate::knowledge::KnowledgeBase;
use crate::models::{Crop, DiseaseLabel, PredictionOutcome, PredictionRequest};

pub const IDLE_PROMPT: &str = "Adjust the sliders and click Predict to see results.";

/// What the main panel shows. `Predicting` is never rendered: the page is
/// produced only once the prediction has settled.
#[derive(Debug, Clone)]
pub enum PageState {
    AwaitingInput,
    ShowingResult(PredictionOutcome),
    Failed(String),
}

/// Joins a decoded label with its advisory entry and the record that produced it.
pub fn render(
    kb: &KnowledgeBase,
    label: DiseaseLabel,
    request: &PredictionRequest,
) -> PredictionOutcome {
    PredictionOutcome {
        known_disease: kb.is_known(label.as_str()),
        advisory: kb.lookup(label.as_str()).clone(),
        disease: label,
        crop: request.crop,
        features: request.to_feature_row(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub fn render_page(form: &FormInput, state: &PageState) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
        "<meta charset=\"utf-8\">\n",
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        "<title>Crop Disease Prediction</title>\n",
        "<link rel=\"icon\" href=\"data:,🌾\">\n",
        "<link rel=\"stylesheet\" href=\"/static/style.css\">\n",
        "</head>\n<body>\n<div class=\"layout\">\n"
    ));

    render_sidebar(&mut html, form);

    html.push_str("<main class=\"main\">\n");
    html.push_str("<h1 class=\"title\">🌾 Smart Crop Disease Prediction</h1>\n<hr>\n");
    match state {
        PageState::AwaitingInput => {
            let _ = writeln!(html, "<div class=\"banner info\">{}</div>", IDLE_PROMPT);
        }
        PageState::ShowingResult(outcome) => render_outcome(&mut html, outcome),
        PageState::Failed(reason) => {
            let _ = writeln!(
                html,
                "<div class=\"banner error\"><strong>Prediction failed.</strong> {}</div>",
                escape_html(reason)
            );
        }
    }
    html.push_str("</main>\n</div>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, form: &FormInput) {
    html.push_str("<aside class=\"sidebar\">\n<h2>🌱 Input Parameters</h2>\n");
    html.push_str("<form method=\"post\" action=\"/\">\n");

    html.push_str("<label for=\"crop\">Select Crop</label>\n<select id=\"crop\" name=\"crop\">\n");
    for crop in Crop::ALL {
        let selected = if crop == form.request.crop { " selected" } else { "" };
        let _ = writeln!(html, "<option value=\"{0}\"{1}>{0}</option>", crop.as_str(), selected);
    }
    html.push_str("</select>\n");

    html.push_str("<h3>🌦 Environment</h3>\n");
    for slider in &ENVIRONMENT_SLIDERS {
        render_slider(html, form, slider);
    }

    html.push_str("<h3>🧪 Soil &amp; Health</h3>\n");
    for slider in &SOIL_SLIDERS {
        render_slider(html, form, slider);
    }

    for toggle in &SYMPTOM_TOGGLES {
        let current = form.toggle_value(toggle.name).unwrap_or(false);
        let _ = writeln!(html, "<fieldset class=\"radio\">\n<legend>{}</legend>", toggle.label);
        for option in [false, true] {
            let checked = if option == current { " checked" } else { "" };
            let _ = writeln!(
                html,
                "<label><input type=\"radio\" name=\"{0}\" value=\"{1}\"{2}> {1}</label>",
                toggle.name,
                yes_no(option),
                checked
            );
        }
        html.push_str("</fieldset>\n");
    }

    let _ = writeln!(
        html,
        "<button type=\"submit\" name=\"{}\" value=\"1\">🔍 Predict Disease</button>",
        SUBMIT_FIELD
    );
    html.push_str("</form>\n</aside>\n");
}

fn render_slider(html: &mut String, form: &FormInput, slider: &Slider) {
    let value = form.slider_value(slider.name).unwrap_or(slider.domain.default);
    let _ = writeln!(
        html,
        concat!(
            "<label for=\"{name}\">{icon} {label}</label>\n",
            "<div class=\"slider\"><input type=\"range\" id=\"{name}\" name=\"{name}\" ",
            "min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" ",
            "oninput=\"this.nextElementSibling.value=this.value\">",
            "<output>{value}</output></div>"
        ),
        name = slider.name,
        icon = slider.icon,
        label = escape_html(slider.domain.label),
        min = slider.domain.min,
        max = slider.domain.max,
        step = slider.step,
        value = value,
    );
}

fn render_outcome(html: &mut String, outcome: &PredictionOutcome) {
    let advisory = &outcome.advisory;
    html.push_str("<div class=\"metrics\">\n");
    let _ = writeln!(
        html,
        "<div class=\"metric\"><span class=\"metric-label\">Disease Detected</span><span class=\"metric-value\" style=\"color:{}\">{}</span></div>",
        escape_html(advisory.color),
        escape_html(outcome.disease.as_str())
    );
    let _ = writeln!(
        html,
        "<div class=\"metric\"><span class=\"metric-label\">Severity Level</span><span class=\"metric-value\">{}</span></div>",
        escape_html(advisory.severity)
    );
    let _ = writeln!(
        html,
        "<div class=\"metric\"><span class=\"metric-label\">Treatment</span><span class=\"metric-text\"><strong>Fertilizer:</strong> {}</span></div>",
        escape_html(advisory.treatment)
    );
    html.push_str("</div>\n");

    let _ = writeln!(
        html,
        "<div class=\"banner success\">Prediction Complete for {}!</div>\n<hr>",
        outcome.crop
    );

    html.push_str("<h2>📋 Data Sent to Model</h2>\n<table class=\"features\">\n<thead><tr>");
    for (column, _) in outcome.features.columns() {
        let _ = write!(html, "<th>{}</th>", escape_html(column));
    }
    html.push_str("</tr></thead>\n<tbody><tr>");
    for (_, value) in outcome.features.columns() {
        let _ = write!(html, "<td>{}</td>", escape_html(&value.to_string()));
    }
    html.push_str("</tr></tbody>\n</table>\n");
}
