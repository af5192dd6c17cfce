//! Field and line rendering.

use serde_json::Value;

/// Render a single cell. Absent and null values are empty.
pub(crate) fn render_value(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(Value::Bool(b)) => b.to_string(),
    // Whole floats print without a fractional part, as a form would show them.
    Some(Value::Number(n)) => match n.as_f64() {
      Some(f) if n.is_f64() => f.to_string(),
      _ => n.to_string(),
    },
    // Compact JSON for nested values.
    Some(nested) => nested.to_string(),
  }
}

/// Quote `field` iff it contains a comma, a double quote or a newline.
pub(crate) fn escape_field(field: &str) -> String {
  if field.contains([',', '"', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_owned()
  }
}

pub(crate) fn push_line<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
  if !out.is_empty() {
    out.push('\n');
  }
  for (i, field) in fields.into_iter().enumerate() {
    if i > 0 {
      out.push(',');
    }
    out.push_str(&escape_field(field));
  }
}
