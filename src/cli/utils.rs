use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format; `data` fields are merged
/// into the JSON object
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a bare value in text mode (e.g. a token for shell capture), or the
/// JSON envelope in JSON mode
pub fn output_value(output_format: OutputFormat, key: &str, value: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, key: value }))?);
        }
        OutputFormat::Text => println!("{}", value),
    }
    Ok(())
}
