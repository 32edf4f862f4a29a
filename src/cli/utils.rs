use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::{ClientError, ErrorKind};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
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

/// Output error details in the appropriate format
pub fn output_error(output_format: &OutputFormat, err: &ClientError) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": false,
                "error": err.message,
                "kind": kind_name(err.kind),
                "fields": err.field_errors,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        // The message itself is printed by the binary when the command fails.
        OutputFormat::Text => {
            let mut fields: Vec<_> = err.field_errors.iter().collect();
            fields.sort();
            for (field, message) in fields {
                eprintln!("  {}: {}", field, message);
            }
            if err.kind == ErrorKind::SessionInvalidated {
                eprintln!("Signed out. Run `chanakya auth login` to continue.");
            }
        }
    }
    Ok(())
}

/// Report a failed operation and turn it into the command's error.
pub fn fail(output_format: &OutputFormat, err: ClientError) -> anyhow::Error {
    if let Err(e) = output_error(output_format, &err) {
        return e;
    }
    anyhow::Error::new(err)
}

pub fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::Authentication => "authentication",
        ErrorKind::SessionInvalidated => "session_invalidated",
        ErrorKind::Transport => "transport",
    }
}

/// Use the provided value or read one line from stdin after a prompt on stderr.
pub fn value_or_prompt(provided: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(value) = provided {
        return Ok(value);
    }

    eprint!("{}: ", prompt);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
