use std::collections::BTreeMap;
use std::path::Path;
use std::process;

use annals_core::{Date, Diagnostics, LoadConfig};

use super::print_diagnostics;
use crate::dataset::{load_catalog, load_histories};
use crate::{report_error, OutputFormat};

/// What `resolve` prints.
pub(crate) enum Selection {
    Province(String),
    Country(String),
    All,
}

/// Load a data directory and print the state in effect at `date`.
///
/// Defects in the data are reported on stderr but do not stop resolution;
/// only an unresolvable selection fails.
pub(crate) fn cmd_resolve(
    dir: &Path,
    date: &str,
    selection: &Selection,
    config: &LoadConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let date = match date.parse::<Date>() {
        Ok(d) => d,
        Err(ds) => {
            print_diagnostics(&ds, output, quiet);
            process::exit(1);
        }
    };
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
    diagnostics.extend(histories.diagnostics);
    print_diagnostics(&diagnostics, output, quiet);

    match selection {
        Selection::Province(id) => {
            if let Err(ds) = catalog.provinces.expect_item_str(id) {
                print_diagnostics(&ds, output, quiet);
                process::exit(1);
            }
            let Some(state) = histories.provinces.state_at(id, date) else {
                report_error(&format!("province {} has no history", id), output, quiet);
                process::exit(1);
            };
            print_state("province", id, date, &state, state.to_json_value(), output, quiet);
        }
        Selection::Country(tag) => {
            if let Err(ds) = catalog.countries.expect_item_str(tag) {
                print_diagnostics(&ds, output, quiet);
                process::exit(1);
            }
            let Some(state) = histories.countries.state_at(tag, date) else {
                report_error(&format!("country {} has no history", tag), output, quiet);
                process::exit(1);
            };
            print_state("country", tag, date, &state, state.to_json_value(), output, quiet);
        }
        Selection::All => {
            let (provinces, province_gaps) = histories.provinces.snapshot(date);
            let (countries, country_gaps) = histories.countries.snapshot(date);
            let mut gaps = Diagnostics::new();
            gaps.extend(province_gaps);
            gaps.extend(country_gaps);
            print_diagnostics(&gaps, output, quiet);
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => {
                    let report = serde_json::json!({
                        "date": date,
                        "provinces": provinces
                            .iter()
                            .map(|(id, s)| (*id, s.to_json_value()))
                            .collect::<BTreeMap<_, _>>(),
                        "countries": countries
                            .iter()
                            .map(|(tag, s)| (*tag, s.to_json_value()))
                            .collect::<BTreeMap<_, _>>(),
                    });
                    let json = serde_json::to_string_pretty(&report)
                        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                    println!("{}", json);
                }
                OutputFormat::Text => {
                    for (id, state) in &provinces {
                        println!("province {} at {}", id, date);
                        println!("{}", indent(&state.to_string()));
                    }
                    for (tag, state) in &countries {
                        println!("country {} at {}", tag, date);
                        println!("{}", indent(&state.to_string()));
                    }
                }
            }
        }
    }
}

fn print_state(
    kind: &str,
    id: &str,
    date: Date,
    state: &dyn std::fmt::Display,
    json: serde_json::Value,
    output: OutputFormat,
    quiet: bool,
) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "kind": kind,
                "id": id,
                "date": date,
                "state": json,
            });
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{} {} at {}", kind, id, date);
            println!("{}", indent(&state.to_string()));
        }
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
