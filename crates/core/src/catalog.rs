//! Entity registries that history records refer to.
//!
//! The catalog file declares every country, province, building type and
//! the plain name lists (goods, cultures, ...) that history files may name:
//!
//! ```text
//! countries = { ENG = { color = { 255 0 0 } party = ENG_conservative } }
//! provinces = { 1 = { } 2 = { water = yes } }
//! buildings = { fort = { max_level = 6 } }
//! reforms = { slavery = { yes_slavery no_slavery } }
//! goods = { grain iron }
//! ```

use std::fmt;

use crate::ast::Node;
use crate::colour::Colour;
use crate::error::{Diagnostics, Outcome};
use crate::registry::{HasIdentifier, IdentifierRegistry};
use crate::validate::{
    assign, assign_opt, expect_bool, expect_colour, expect_dictionary, expect_identifier,
    expect_name_list, expect_uint, push, Cardinality, KeySchema,
};

// ──────────────────────────────────────────────
// Items
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Country {
    pub identifier: String,
    pub colour: Colour,
    /// Parties that can rule this country.
    pub parties: Vec<String>,
}

impl Country {
    pub fn has_party(&self, party: &str) -> bool {
        self.parties.iter().any(|p| p == party)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Province {
    pub identifier: String,
    pub is_water: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Building {
    pub identifier: String,
    pub max_level: u8,
}

/// One option of a reform group, e.g. `yes_slavery` in `slavery`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reform {
    pub identifier: String,
    pub group: String,
}

/// An item that carries nothing but its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Definition {
    pub identifier: String,
}

macro_rules! identified {
    ($($ty:ty),*) => {$(
        impl HasIdentifier for $ty {
            fn identifier(&self) -> &str {
                &self.identifier
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.identifier)
            }
        }
    )*};
}

identified!(Country, Province, Building, Reform, Definition);

// ──────────────────────────────────────────────
// Catalog
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Catalog {
    pub countries: IdentifierRegistry<Country>,
    pub provinces: IdentifierRegistry<Province>,
    pub buildings: IdentifierRegistry<Building>,
    pub reform_groups: IdentifierRegistry<Definition>,
    pub reforms: IdentifierRegistry<Reform>,
    pub goods: IdentifierRegistry<Definition>,
    pub terrain_types: IdentifierRegistry<Definition>,
    pub ideologies: IdentifierRegistry<Definition>,
    pub cultures: IdentifierRegistry<Definition>,
    pub religions: IdentifierRegistry<Definition>,
    pub governments: IdentifierRegistry<Definition>,
    pub national_values: IdentifierRegistry<Definition>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            countries: IdentifierRegistry::new("countries"),
            provinces: IdentifierRegistry::new("provinces"),
            buildings: IdentifierRegistry::new("buildings"),
            reform_groups: IdentifierRegistry::new("reform_groups"),
            reforms: IdentifierRegistry::new("reforms"),
            goods: IdentifierRegistry::new("goods"),
            terrain_types: IdentifierRegistry::new("terrain_types"),
            ideologies: IdentifierRegistry::new("ideologies"),
            cultures: IdentifierRegistry::new("cultures"),
            religions: IdentifierRegistry::new("religions"),
            governments: IdentifierRegistry::new("governments"),
            national_values: IdentifierRegistry::new("national_values"),
        }
    }

    /// Load every section of a catalog file, then lock all registries.
    ///
    /// Registries are locked even when the file had defects so history
    /// loading can proceed against whatever was read.
    pub fn load_catalog_file(&mut self, root: &Node) -> Outcome {
        let mut diagnostics = Diagnostics::new();
        {
            let Catalog {
                countries,
                provinces,
                buildings,
                reform_groups,
                reforms,
                goods,
                terrain_types,
                ideologies,
                cultures,
                religions,
                governments,
                national_values,
            } = self;
            let once = Cardinality::ZeroOrOne;
            diagnostics.record(
                KeySchema::new()
                    .key("countries", once, |node| load_countries(countries, node))
                    .key("provinces", once, |node| load_provinces(provinces, node))
                    .key("buildings", once, |node| load_buildings(buildings, node))
                    .key("reforms", once, |node| load_reforms(reform_groups, reforms, node))
                    .key("goods", once, |node| load_names(goods, node))
                    .key("terrain_types", once, |node| load_names(terrain_types, node))
                    .key("ideologies", once, |node| load_names(ideologies, node))
                    .key("cultures", once, |node| load_names(cultures, node))
                    .key("religions", once, |node| load_names(religions, node))
                    .key("governments", once, |node| load_names(governments, node))
                    .key("national_values", once, |node| load_names(national_values, node))
                    .validate(root),
            );
        }

        for result in [
            self.countries.lock(),
            self.provinces.lock(),
            self.buildings.lock(),
            self.reform_groups.lock(),
            self.reforms.lock(),
            self.goods.lock(),
            self.terrain_types.lock(),
            self.ideologies.lock(),
            self.cultures.lock(),
            self.religions.lock(),
            self.governments.lock(),
            self.national_values.lock(),
        ] {
            if let Err(d) = result {
                diagnostics.push(d);
            }
        }
        tracing::debug!(
            countries = self.countries.len(),
            provinces = self.provinces.len(),
            buildings = self.buildings.len(),
            "loaded catalog"
        );
        diagnostics.finish(())
    }

    pub fn is_locked(&self) -> bool {
        self.countries.is_locked() && self.provinces.is_locked()
    }

    /// Provinces expected to carry history.
    pub fn land_provinces(&self) -> impl Iterator<Item = &Province> + '_ {
        self.provinces.iter().filter(|p| !p.is_water)
    }
}

fn load_countries(registry: &mut IdentifierRegistry<Country>, node: &Node) -> Outcome {
    expect_dictionary(node, |tag, value| {
        let mut colour = Colour::NULL;
        let mut parties = Vec::new();
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(
            KeySchema::new()
                .key("color", Cardinality::ExactlyOne, assign(&mut colour, expect_colour))
                .key(
                    "party",
                    Cardinality::ZeroOrMore,
                    push(&mut parties, |n: &Node| expect_identifier(n).map(str::to_owned)),
                )
                .validate(value),
        );
        diagnostics.record(
            registry
                .add(Country {
                    identifier: tag.to_owned(),
                    colour,
                    parties,
                })
                .map_err(Diagnostics::from),
        );
        diagnostics.finish(())
    })
}

fn load_provinces(registry: &mut IdentifierRegistry<Province>, node: &Node) -> Outcome {
    expect_dictionary(node, |identifier, value| {
        let mut is_water = None;
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(
            KeySchema::new()
                .key("water", Cardinality::ZeroOrOne, assign_opt(&mut is_water, expect_bool))
                .validate(value),
        );
        diagnostics.record(
            registry
                .add(Province {
                    identifier: identifier.to_owned(),
                    is_water: is_water.unwrap_or(false),
                })
                .map_err(Diagnostics::from),
        );
        diagnostics.finish(())
    })
}

fn load_buildings(registry: &mut IdentifierRegistry<Building>, node: &Node) -> Outcome {
    expect_dictionary(node, |identifier, value| {
        let mut max_level = 0u8;
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(
            KeySchema::new()
                .key(
                    "max_level",
                    Cardinality::ExactlyOne,
                    assign(&mut max_level, expect_uint::<u8>),
                )
                .validate(value),
        );
        diagnostics.record(
            registry
                .add(Building {
                    identifier: identifier.to_owned(),
                    max_level,
                })
                .map_err(Diagnostics::from),
        );
        diagnostics.finish(())
    })
}

/// `GROUP = { REFORM ... }` for every reform group.
fn load_reforms(
    groups: &mut IdentifierRegistry<Definition>,
    reforms: &mut IdentifierRegistry<Reform>,
    node: &Node,
) -> Outcome {
    expect_dictionary(node, |group, value| {
        let mut diagnostics = Diagnostics::new();
        let added = groups.add(Definition {
            identifier: group.to_owned(),
        });
        if let Err(d) = added {
            diagnostics.push(d.at_line(value.line));
        }
        if let Some(names) = diagnostics.record(expect_name_list(value)) {
            for name in names {
                let added = reforms.add(Reform {
                    identifier: name.to_owned(),
                    group: group.to_owned(),
                });
                if let Err(d) = added {
                    diagnostics.push(d.at_line(value.line));
                }
            }
        }
        diagnostics.finish(())
    })
}

fn load_names(registry: &mut IdentifierRegistry<Definition>, node: &Node) -> Outcome {
    let names = expect_name_list(node)?;
    let mut diagnostics = Diagnostics::new();
    for name in names {
        let added = registry.add(Definition {
            identifier: name.to_owned(),
        });
        if let Err(d) = added {
            diagnostics.push(d.at_line(node.line));
        }
    }
    diagnostics.finish(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::parser::parse_script;

    const CATALOG: &str = r#"
countries = {
    ENG = { color = { 255 0 0 } party = ENG_conservative party = ENG_liberal }
    FRA = { color = { 0.0 0.0 1.0 } }
}
provinces = {
    1 = { }
    2 = { water = yes }
    3 = { water = no }
}
buildings = { fort = { max_level = 6 } }
reforms = {
    slavery = { yes_slavery no_slavery }
    press_rights = { censored_press free_press }
}
goods = { grain iron }
cultures = { british "french" }
"#;

    fn load(src: &str) -> (Catalog, Outcome) {
        let root = parse_script(src, "catalog.txt").unwrap();
        let mut catalog = Catalog::new();
        let outcome = catalog.load_catalog_file(&root);
        (catalog, outcome)
    }

    #[test]
    fn loads_and_locks_every_registry() {
        let (catalog, outcome) = load(CATALOG);
        outcome.unwrap();
        assert!(catalog.is_locked());
        assert!(catalog.goods.is_locked() && catalog.national_values.is_locked());
        assert_eq!(catalog.countries.get("FRA").unwrap().colour, Colour(0x0000FF));
        assert_eq!(catalog.buildings.get("fort").unwrap().max_level, 6);
        assert_eq!(catalog.cultures.len(), 2);
        let england = catalog.countries.get("ENG").unwrap();
        assert!(england.has_party("ENG_liberal") && !england.has_party("FRA_liberal"));
        assert!(catalog.countries.get("FRA").unwrap().parties.is_empty());
        assert_eq!(catalog.reform_groups.len(), 2);
        assert_eq!(catalog.reforms.get("free_press").unwrap().group, "press_rights");
        assert!(catalog.reforms.is_locked());
        let land: Vec<_> = catalog.land_provinces().map(|p| p.identifier.as_str()).collect();
        assert_eq!(land, vec!["1", "3"]);
    }

    #[test]
    fn defects_are_collected_across_sections() {
        let (catalog, outcome) = load(
            "countries = { ENG = { } }\nbuildings = { fort = { max_level = 300 } }\ngoods = { grain grain }\nmystery = { }",
        );
        let err = outcome.unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Cardinality)); // ENG without color
        assert!(err.has_kind(DiagnosticKind::Range)); // max_level
        assert!(err.has_kind(DiagnosticKind::Consistency)); // duplicate good
        assert!(err.has_kind(DiagnosticKind::StructuralMismatch)); // mystery
        // registries are usable anyway
        assert!(catalog.countries.get("ENG").is_some());
        assert!(catalog.is_locked());
    }

    #[test]
    fn reform_names_are_unique_across_groups() {
        let (catalog, outcome) =
            load("reforms = { slavery = { yes_slavery } serfdom = { yes_slavery } }");
        let err = outcome.unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_kind(DiagnosticKind::Consistency));
        assert_eq!(catalog.reforms.get("yes_slavery").unwrap().group, "slavery");
        assert_eq!(catalog.reform_groups.len(), 2);
    }

    #[test]
    fn second_load_reports_locked_registries() {
        let root = parse_script(CATALOG, "catalog.txt").unwrap();
        let mut catalog = Catalog::new();
        catalog.load_catalog_file(&root).unwrap();
        let err = catalog.load_catalog_file(&root).unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Lifecycle));
        assert_eq!(catalog.countries.len(), 2);
    }
}
