//! Rendering templates with [Handlebars][].
//!
//! [Handlebars]: https://handlebarsjs.com/

use handlebars::{no_escape, Handlebars};

use crate::prelude::*;

fn strict_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
}

/// Render an HTML template. Values are HTML-escaped.
pub fn render_html<T: Serialize>(template: &str, params: &T) -> Result<String> {
    Ok(strict_handlebars().render_template(template, params)?)
}

/// Render a plain-text template, such as `geoconnect file describe` output.
pub fn render_text<T: Serialize>(template: &str, params: &T) -> Result<String> {
    let mut handlebars = strict_handlebars();
    handlebars.register_escape_fn(no_escape);
    Ok(handlebars.render_template(template, params)?)
}

#[test]
fn html_is_escaped_and_text_is_not() {
    let params = serde_json::json!({"name": "<b>Boston</b>"});
    assert_eq!(
        render_html("{{name}}", &params).unwrap(),
        "&lt;b&gt;Boston&lt;/b&gt;"
    );
    assert_eq!(render_text("{{name}}", &params).unwrap(), "<b>Boston</b>");
}

#[test]
fn missing_values_are_errors() {
    let params = serde_json::json!({});
    assert!(render_text("{{nope}}", &params).is_err());
}
