use std::path::Path;
use std::process;

use annals_core::{Diagnostics, LoadConfig};

use crate::dataset::{load_catalog, load_histories};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_check(dir: &Path, config: &LoadConfig, output: OutputFormat, quiet: bool) {
    let (catalog, catalog_diagnostics) = match load_catalog(dir) {
        Ok(loaded) => loaded,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let histories = match load_histories(&catalog, config, dir) {
        Ok(h) => h,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut diagnostics = catalog_diagnostics;
    let clean = diagnostics.is_empty() && histories.is_clean();
    diagnostics.extend(histories.diagnostics);

    if !quiet {
        match output {
            OutputFormat::Json => {
                let report = serde_json::json!({
                    "ok": clean,
                    "countries": catalog.countries.len(),
                    "provinces": catalog.provinces.len(),
                    "country_histories": histories.countries.len(),
                    "province_histories": histories.provinces.len(),
                    "diagnostics": diagnostics.iter().map(|d| d.to_json_value()).collect::<Vec<_>>(),
                    "warnings": histories.warnings,
                });
                let json = serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => {
                print_text(&diagnostics, &histories.warnings);
                println!(
                    "{}: {} countries, {} provinces, {} country histories, {} province histories, {} error(s), {} warning(s)",
                    if clean { "ok" } else { "failed" },
                    catalog.countries.len(),
                    catalog.provinces.len(),
                    histories.countries.len(),
                    histories.provinces.len(),
                    diagnostics.len(),
                    histories.warnings.len()
                );
            }
        }
    }

    if !clean {
        process::exit(1);
    }
}

fn print_text(diagnostics: &Diagnostics, warnings: &[String]) {
    for d in diagnostics {
        eprintln!("error: {}", d);
    }
    for w in warnings {
        eprintln!("warning: {}", w);
    }
}
