use std::process;

use annals_core::Date;

use super::print_diagnostics;
use crate::OutputFormat;

pub(crate) fn cmd_date(text: &str, output: OutputFormat, quiet: bool) {
    let parsed = Date::parse(text);
    if !parsed.is_ok() {
        print_diagnostics(&parsed.diagnostics, output, quiet);
        process::exit(1);
    }
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "date": parsed.value }));
        }
        OutputFormat::Text => println!("{}", parsed.value),
    }
}
