//! Walking a data directory and feeding its files to the core.
//!
//! Layout:
//!
//! ```text
//! <dir>/catalog.txt
//! <dir>/history/provinces/<id> - <name>.txt
//! <dir>/history/countries/<TAG> - <name>.txt
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use annals_core::{
    parse_script, Catalog, CountryHistoryManager, Diagnostic, Diagnostics, LoadConfig, Node,
    Outcome, ProvinceHistoryManager,
};

/// Histories loaded from one directory, plus everything that went wrong.
pub(crate) struct Histories<'a> {
    pub provinces: ProvinceHistoryManager<'a>,
    pub countries: CountryHistoryManager<'a>,
    pub diagnostics: Diagnostics,
    pub warnings: Vec<String>,
}

impl Histories<'_> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Read and load `<dir>/catalog.txt`.
///
/// A missing or unparseable catalog is fatal; defects inside it are
/// returned alongside the (locked) catalog.
pub(crate) fn load_catalog(dir: &Path) -> Result<(Catalog, Diagnostics), String> {
    let path = dir.join("catalog.txt");
    let name = display_name(&path);
    let text = fs::read_to_string(&path)
        .map_err(|e| format!("error reading catalog '{}': {}", path.display(), e))?;
    let root = parse_script(&text, &name).map_err(|d| d.in_file(&name).to_string())?;

    let mut catalog = Catalog::new();
    let diagnostics = match catalog.load_catalog_file(&root) {
        Ok(()) => Diagnostics::new(),
        Err(ds) => ds.in_file(&name),
    };
    Ok((catalog, diagnostics))
}

/// Load every province and country history file, then lock both managers.
pub(crate) fn load_histories<'a>(
    catalog: &'a Catalog,
    config: &LoadConfig,
    dir: &Path,
) -> Result<Histories<'a>, String> {
    let mut provinces = ProvinceHistoryManager::new();
    let mut countries = CountryHistoryManager::new();
    let mut diagnostics = Diagnostics::new();
    let mut warnings = Vec::new();

    let history = dir.join("history");
    let province_files = load_dir(&history.join("provinces"), &mut diagnostics, |id, root| {
        let province = catalog.provinces.expect_item_str(id)?;
        provinces.load_history_file(catalog, config, province, root)
    })?;
    let country_files = load_dir(&history.join("countries"), &mut diagnostics, |tag, root| {
        let country = catalog.countries.expect_item_str(tag)?;
        countries.load_history_file(catalog, config, country, root)
    })?;
    tracing::info!(
        provinces = province_files,
        countries = country_files,
        "read history files"
    );

    match provinces.lock_histories(catalog) {
        Ok(missing) => warnings.extend(
            missing
                .into_iter()
                .map(|id| format!("province {} has no history", id)),
        ),
        Err(e) => diagnostics.push(Diagnostic::from(e)),
    }
    match countries.lock_histories(catalog) {
        Ok(missing) => warnings.extend(
            missing
                .into_iter()
                .map(|tag| format!("country {} has no history", tag)),
        ),
        Err(e) => diagnostics.push(Diagnostic::from(e)),
    }

    Ok(Histories {
        provinces,
        countries,
        diagnostics,
        warnings,
    })
}

/// Entity named by a history file: the stem up to the first space or `-`.
pub(crate) fn entity_name(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    let name = stem.split([' ', '-']).next()?.trim();
    (!name.is_empty()).then_some(name)
}

/// Feed every `*.txt` in `dir` to `load`, in file name order.
///
/// A missing directory counts as empty. Returns the number of files read.
fn load_dir(
    dir: &Path,
    diagnostics: &mut Diagnostics,
    mut load: impl FnMut(&str, &Node) -> Outcome,
) -> Result<usize, String> {
    let files = match txt_files(dir) {
        Ok(files) => files,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "no history directory");
            return Ok(0);
        }
        Err(e) => return Err(format!("error reading '{}': {}", dir.display(), e)),
    };

    for path in &files {
        let name = display_name(path);
        let Some(entity) = entity_name(path) else {
            diagnostics.push(
                Diagnostic::structural("history file name does not start with an identifier")
                    .in_file(&name),
            );
            continue;
        };
        let text = fs::read_to_string(path)
            .map_err(|e| format!("error reading '{}': {}", path.display(), e))?;
        let root = match parse_script(&text, &name) {
            Ok(root) => root,
            Err(d) => {
                diagnostics.push(d.in_file(&name));
                continue;
            }
        };
        if let Err(ds) = load(entity, &root) {
            diagnostics.extend(ds.in_file(&name));
        }
    }
    Ok(files.len())
}

fn txt_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_name_stops_at_space_or_dash() {
        assert_eq!(entity_name(Path::new("h/1 - London.txt")), Some("1"));
        assert_eq!(entity_name(Path::new("h/ENG-England.txt")), Some("ENG"));
        assert_eq!(entity_name(Path::new("h/PRU.txt")), Some("PRU"));
        assert_eq!(entity_name(Path::new("h/ - nameless.txt")), None);
    }
}
