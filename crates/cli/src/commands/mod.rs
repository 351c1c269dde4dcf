pub(crate) mod check;
pub(crate) mod date;
pub(crate) mod resolve;

use annals_core::Diagnostics;

use crate::OutputFormat;

/// Print diagnostics to stderr, one per line or as a JSON array.
pub(crate) fn print_diagnostics(diagnostics: &Diagnostics, output: OutputFormat, quiet: bool) {
    if quiet || diagnostics.is_empty() {
        return;
    }
    match output {
        OutputFormat::Text => {
            for d in diagnostics {
                eprintln!("{}", d);
            }
        }
        OutputFormat::Json => {
            let values: Vec<_> = diagnostics.iter().map(|d| d.to_json_value()).collect();
            let json = serde_json::to_string_pretty(&values)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            eprintln!("{}", json);
        }
    }
}
