//! HTML rendering for the assessment page

use crate::error::ModelError;
use crate::types::outcome::{Condition, Outcome};
use crate::types::request::{AssessmentForm, MaintenanceLevel, Material};
use std::fmt::Write;

/// What to show under the form
pub enum Notice<'a> {
    Verdict(&'a Outcome),
    Error { title: &'a str, message: String },
}

/// Everything the page needs for one render
pub struct PageView<'a> {
    pub form: &'a AssessmentForm,
    pub load_error: Option<&'a ModelError>,
    pub notice: Option<Notice<'a>>,
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the verdict block for one outcome
pub fn render_outcome(outcome: &Outcome) -> String {
    let class = match outcome.condition {
        Condition::Good => "success",
        Condition::Poor => "danger",
    };

    let mut html = String::new();
    let _ = write!(
        html,
        "<hr><div class=\"verdict {}\"><h3>{}</h3>",
        class,
        escape(&outcome.headline())
    );

    if let Some(p) = outcome.probabilities {
        let _ = write!(
            html,
            "<table class=\"probabilities\">\
             <tr><th>Good Condition</th><td>{:.1}%</td></tr>\
             <tr><th>Poor Condition</th><td>{:.1}%</td></tr></table>",
            p.good * 100.0,
            p.poor * 100.0
        );
    }

    let _ = write!(
        html,
        "<p class=\"assessed\">Assessed at {} UTC</p></div>",
        outcome.assessed_at.format("%Y-%m-%d %H:%M:%S")
    );
    html
}

fn render_error(title: &str, message: &str, hint: Option<&str>) -> String {
    let mut html = format!(
        "<div class=\"verdict danger\"><strong>{}:</strong> {}",
        escape(title),
        escape(message)
    );
    if let Some(hint) = hint {
        let _ = write!(html, "<p class=\"hint\">{}</p>", escape(hint));
    }
    html.push_str("</div>");
    html
}

fn render_select<I>(name: &str, label: &str, options: I, selected: &str) -> String
where
    I: IntoIterator<Item = &'static str>,
{
    let mut html = format!(
        "<label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\">"
    );
    for option in options {
        let sel = if option == selected { " selected" } else { "" };
        let _ = write!(
            html,
            "<option value=\"{0}\"{1}>{0}</option>",
            escape(option),
            sel
        );
    }
    html.push_str("</select>");
    html
}

fn render_number(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
         <input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"0\" step=\"1\" value=\"{}\">",
        escape(value)
    )
}

/// Render the full page
pub fn render_page(view: &PageView<'_>) -> String {
    let mut body = String::new();

    if let Some(err) = view.load_error {
        body.push_str(&render_error("Error loading model", &err.to_string(), err.hint()));
    }

    let disabled = if view.load_error.is_some() { " disabled" } else { "" };

    let _ = write!(
        body,
        "<h2>Enter Bridge Details</h2>\
         <form method=\"post\" action=\"/predict\"><div class=\"columns\">\
         <div>{}{}</div><div>{}{}</div></div>\
         <button type=\"submit\"{}>Predict Condition</button></form>",
        render_number("age", "Age of Bridge (years)", &view.form.age),
        render_number("traffic", "Traffic Volume", &view.form.traffic),
        render_select(
            "material",
            "Material Type",
            Material::ALL.iter().map(|m| m.label()),
            &view.form.material
        ),
        render_select(
            "maintenance",
            "Maintenance Level",
            MaintenanceLevel::ALL.iter().map(|m| m.label()),
            &view.form.maintenance
        ),
        disabled
    );

    match &view.notice {
        Some(Notice::Verdict(outcome)) => body.push_str(&render_outcome(outcome)),
        Some(Notice::Error { title, message }) => {
            body.push_str("<hr>");
            body.push_str(&render_error(title, message, None));
        }
        None => {}
    }

    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>Bridge Assessment</title><style>{}</style></head>\
         <body><main><h1>&#127753; Bridge Condition Predictor</h1>{}</main></body></html>",
        STYLE, body
    )
}

const STYLE: &str = "body{font-family:sans-serif;max-width:44rem;margin:2rem auto;padding:0 1rem}\
.columns{display:flex;gap:2rem}.columns>div{flex:1;display:flex;flex-direction:column}\
label{margin-top:.75rem}input,select{padding:.4rem}button{margin-top:1.25rem;padding:.5rem 1rem}\
.verdict{padding:.75rem 1rem;border-radius:.4rem;margin-top:1rem}\
.success{background:#e6f4ea;color:#1e4620}.danger{background:#fdecea;color:#611a15}\
.hint,.assessed{font-size:.9rem;margin:.5rem 0 0}.probabilities td{padding-left:1rem}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::outcome::ClassProbabilities;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_good_and_poor() {
        let good = render_outcome(&Outcome::new(0));
        assert!(good.contains("Prediction: Good Condition (0)"));
        assert!(good.contains("success"));

        let poor = render_outcome(&Outcome::new(1));
        assert!(poor.contains("Prediction: Poor Condition (1)"));
        assert!(poor.contains("danger"));
    }

    #[test]
    fn test_render_probabilities() {
        let outcome = Outcome::new(1).with_probabilities(ClassProbabilities::new(0.25, 0.75));
        let html = render_outcome(&outcome);
        assert!(html.contains("25.0%"));
        assert!(html.contains("75.0%"));
    }

    #[test]
    fn test_render_assessment_time() {
        let mut outcome = Outcome::new(0);
        outcome.assessed_at = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 5).unwrap();

        let html = render_outcome(&outcome);

        assert!(html.contains("Assessed at 2024-05-17 09:30:05 UTC"));
    }

    #[test]
    fn test_page_keeps_submitted_values() {
        let form = AssessmentForm {
            age: "42".to_string(),
            traffic: "\"><b>".to_string(),
            material: "Steel".to_string(),
            maintenance: "Bi-Annual".to_string(),
        };
        let html = render_page(&PageView {
            form: &form,
            load_error: None,
            notice: None,
        });

        assert!(html.contains("value=\"42\""));
        assert!(html.contains("value=\"&quot;&gt;&lt;b&gt;\""));
        assert!(html.contains("<option value=\"Steel\" selected>"));
        assert!(html.contains("<option value=\"Bi-Annual\" selected>"));
        assert!(!html.contains(" disabled"));
    }

    #[test]
    fn test_load_error_disables_submit() {
        let err = ModelError::NotFound {
            path: PathBuf::from("model.onnx"),
        };
        let html = render_page(&PageView {
            form: &AssessmentForm::default(),
            load_error: Some(&err),
            notice: None,
        });

        assert!(html.contains("Error loading model"));
        assert!(html.contains("Model file not found at model.onnx"));
        assert!(html.contains("<button type=\"submit\" disabled>"));
    }
}
