use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message and its data in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "message": message,
                    "data": data
                }))?
            );
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            for line in text_lines(&data) {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });
            if let Some(code) = error_code {
                response["code"] = json!(code);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => match error_code {
            Some(code) => eprintln!("Error [{}]: {}", code, message),
            None => eprintln!("Error: {}", message),
        },
    }
    Ok(())
}

/// Flatten an object one level deep into `key: value` lines
fn text_lines(data: &Value) -> Vec<String> {
    match data {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                Value::Array(items) => format!("{}: {} item(s)", key, items.len()),
                other => format!("{}: {}", key, other),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
