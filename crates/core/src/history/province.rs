use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;

use super::load::{load_dated_history, OtherKeys};
use super::{overwrite, HistoryEntry, HistoryManager, MissingDelta};
use crate::ast::Node;
use crate::catalog::{Building, Catalog, Country, Definition, Province};
use crate::config::LoadConfig;
use crate::error::{BestEffort, Diagnostic, Diagnostics, HistoryError, Outcome};
use crate::validate::{
    assign_opt, expect_bool, expect_uint, push, success, Cardinality, KeySchema,
};

pub type ProvinceHistoryManager<'a> = HistoryManager<'a, ProvinceHistoryEntry<'a>>;

/// What one dated block of a province history file says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvinceHistoryEntry<'a> {
    pub owner: Option<&'a Country>,
    pub controller: Option<&'a Country>,
    pub colonial: Option<u8>,
    pub is_slave: Option<bool>,
    pub trade_goods: Option<&'a Definition>,
    pub life_rating: Option<u8>,
    pub terrain: Option<&'a Definition>,
    /// Replaces every building level when set.
    pub buildings: Option<BTreeMap<&'a Building, u8>>,
    pub party_loyalties: Option<BTreeMap<&'a Definition, u8>>,
    /// Delta: cores granted at this date.
    pub cores: Vec<&'a Country>,
    /// Delta: cores revoked at this date, applied before grants.
    pub removed_cores: Vec<&'a Country>,
}

/// A province's resolved attributes at some date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvinceState<'a> {
    pub owner: Option<&'a Country>,
    pub controller: Option<&'a Country>,
    pub colonial: u8,
    pub is_slave: bool,
    pub trade_goods: Option<&'a Definition>,
    pub life_rating: u8,
    pub terrain: Option<&'a Definition>,
    pub buildings: BTreeMap<&'a Building, u8>,
    pub party_loyalties: BTreeMap<&'a Definition, u8>,
    pub cores: Vec<&'a Country>,
}

impl<'a> ProvinceState<'a> {
    pub fn is_core_of(&self, country: &Country) -> bool {
        self.cores.iter().any(|c| *c == country)
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "owner": self.owner.map(|c| c.identifier.as_str()),
            "controller": self.controller.map(|c| c.identifier.as_str()),
            "colonial": self.colonial,
            "is_slave": self.is_slave,
            "trade_goods": self.trade_goods.map(|g| g.identifier.as_str()),
            "life_rating": self.life_rating,
            "terrain": self.terrain.map(|t| t.identifier.as_str()),
            "buildings": self
                .buildings
                .iter()
                .map(|(b, level)| (b.identifier.as_str(), *level))
                .collect::<BTreeMap<_, _>>(),
            "party_loyalties": self
                .party_loyalties
                .iter()
                .map(|(i, loyalty)| (i.identifier.as_str(), *loyalty))
                .collect::<BTreeMap<_, _>>(),
            "cores": self.cores.iter().map(|c| c.identifier.as_str()).collect::<Vec<_>>(),
        })
    }
}

impl fmt::Display for ProvinceState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_none<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "none".to_owned(), |v| v.to_string())
        }
        writeln!(f, "owner: {}", or_none(self.owner))?;
        writeln!(f, "controller: {}", or_none(self.controller))?;
        writeln!(f, "colonial: {}", self.colonial)?;
        writeln!(f, "is_slave: {}", self.is_slave)?;
        writeln!(f, "trade_goods: {}", or_none(self.trade_goods))?;
        writeln!(f, "life_rating: {}", self.life_rating)?;
        writeln!(f, "terrain: {}", or_none(self.terrain))?;
        for (building, level) in &self.buildings {
            writeln!(f, "building {}: {}", building, level)?;
        }
        for (ideology, loyalty) in &self.party_loyalties {
            writeln!(f, "party_loyalty {}: {}", ideology, loyalty)?;
        }
        let cores: Vec<_> = self.cores.iter().map(|c| c.identifier.as_str()).collect();
        write!(f, "cores: {}", cores.join(" "))
    }
}

impl<'a> HistoryEntry for ProvinceHistoryEntry<'a> {
    type State = ProvinceState<'a>;
    const KIND: &'static str = "province";

    fn apply(&self, state: &mut ProvinceState<'a>) {
        if self.owner.is_some() {
            state.owner = self.owner;
        }
        if self.controller.is_some() {
            state.controller = self.controller;
        }
        if let Some(colonial) = self.colonial {
            state.colonial = colonial;
        }
        if let Some(is_slave) = self.is_slave {
            state.is_slave = is_slave;
        }
        if self.trade_goods.is_some() {
            state.trade_goods = self.trade_goods;
        }
        if let Some(life_rating) = self.life_rating {
            state.life_rating = life_rating;
        }
        if self.terrain.is_some() {
            state.terrain = self.terrain;
        }
        if let Some(buildings) = &self.buildings {
            state.buildings = buildings.clone();
        }
        if let Some(loyalties) = &self.party_loyalties {
            state.party_loyalties = loyalties.clone();
        }
        for removed in &self.removed_cores {
            if let Some(i) = state.cores.iter().position(|c| c == removed) {
                state.cores.remove(i);
            }
        }
        state.cores.extend(&self.cores);
    }

    fn absorb(&mut self, newer: Self, before: &ProvinceState<'a>) -> Result<(), MissingDelta> {
        overwrite(&mut self.owner, newer.owner);
        overwrite(&mut self.controller, newer.controller);
        overwrite(&mut self.colonial, newer.colonial);
        overwrite(&mut self.is_slave, newer.is_slave);
        overwrite(&mut self.trade_goods, newer.trade_goods);
        overwrite(&mut self.life_rating, newer.life_rating);
        overwrite(&mut self.terrain, newer.terrain);
        overwrite(&mut self.buildings, newer.buildings);
        overwrite(&mut self.party_loyalties, newer.party_loyalties);

        // No deduplication: granting a core twice lists it twice.
        self.cores.extend(newer.cores);

        let mut missing = Vec::new();
        for country in newer.removed_cores {
            if let Some(i) = self.cores.iter().position(|c| *c == country) {
                self.cores.remove(i);
                continue;
            }
            let held = before.cores.iter().filter(|c| **c == country).count();
            let removed = self.removed_cores.iter().filter(|c| **c == country).count();
            if held > removed {
                self.removed_cores.push(country);
            } else {
                missing.push(country.identifier.clone());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingDelta {
                field: "core",
                missing,
            })
        }
    }
}

fn building_level<'a>(building: &'a Building, value: &Node) -> Outcome<(&'a Building, u8)> {
    let level = expect_uint::<u8>(value)?;
    if level > building.max_level {
        return Err(Diagnostic::range(format!(
            "level {} of building {} exceeds its max level {}",
            level, building, building.max_level
        ))
        .at_line(value.line)
        .into());
    }
    Ok((building, level))
}

/// Read one block of a province history file.
pub(crate) fn read_entry<'a, 'n>(
    catalog: &'a Catalog,
    node: &'n Node,
    other: &mut OtherKeys<'n, '_>,
) -> BestEffort<ProvinceHistoryEntry<'a>> {
    let mut entry = ProvinceHistoryEntry::default();
    // `colonial` and `colony` share one slot; the later key wins.
    let colonial = Cell::new(None);
    let read_colonial = |n: &Node| -> Outcome {
        colonial.set(Some(expect_uint::<u8>(n)?));
        Ok(())
    };
    let mut loyalties = Vec::new();
    let mut state_buildings = Vec::new();
    let mut keyed_buildings = Vec::new();
    let mut diagnostics = Diagnostics::new();

    let countries = move |n: &Node| catalog.countries.expect_item(n);
    let once = Cardinality::ZeroOrOne;
    diagnostics.record(
        KeySchema::new()
            .key("owner", once, assign_opt(&mut entry.owner, countries))
            .key("controller", once, assign_opt(&mut entry.controller, countries))
            .key("add_core", Cardinality::ZeroOrMore, push(&mut entry.cores, countries))
            .key(
                "remove_core",
                Cardinality::ZeroOrMore,
                push(&mut entry.removed_cores, countries),
            )
            .key("colonial", once, read_colonial)
            .key("colony", once, read_colonial)
            .key("is_slave", once, assign_opt(&mut entry.is_slave, expect_bool))
            .key(
                "trade_goods",
                once,
                assign_opt(&mut entry.trade_goods, move |n: &Node| catalog.goods.expect_item(n)),
            )
            .key("life_rating", once, assign_opt(&mut entry.life_rating, expect_uint::<u8>))
            .key(
                "terrain",
                once,
                assign_opt(&mut entry.terrain, move |n: &Node| catalog.terrain_types.expect_item(n)),
            )
            .key("party_loyalty", Cardinality::ZeroOrMore, |node| {
                let mut ideology = None;
                let mut loyalty = None;
                KeySchema::new()
                    .key(
                        "ideology",
                        Cardinality::ExactlyOne,
                        assign_opt(&mut ideology, move |n: &Node| catalog.ideologies.expect_item(n)),
                    )
                    .key(
                        "loyalty_value",
                        Cardinality::ExactlyOne,
                        assign_opt(&mut loyalty, expect_uint::<u8>),
                    )
                    .validate(node)?;
                if let (Some(ideology), Some(loyalty)) = (ideology, loyalty) {
                    loyalties.push((ideology, loyalty));
                }
                Ok(())
            })
            .key("state_building", Cardinality::ZeroOrMore, |node| {
                let mut building = None;
                let mut level = None;
                KeySchema::new()
                    .key(
                        "building",
                        Cardinality::ExactlyOne,
                        assign_opt(&mut building, move |n: &Node| catalog.buildings.expect_item(n)),
                    )
                    .key("level", Cardinality::ExactlyOne, |n| {
                        level = Some(n);
                        Ok(())
                    })
                    .key("upgrade", once, success)
                    .validate(node)?;
                if let (Some(building), Some(level)) = (building, level) {
                    state_buildings.push(building_level(building, level)?);
                }
                Ok(())
            })
            .fallback(|key, value| match catalog.buildings.get(key) {
                Some(building) => {
                    keyed_buildings.push(building_level(building, value)?);
                    Ok(())
                }
                None => other(key, value),
            })
            .validate(node),
    );

    entry.colonial = colonial.get();
    if !loyalties.is_empty() {
        entry.party_loyalties = Some(loyalties.into_iter().collect());
    }
    if !keyed_buildings.is_empty() || !state_buildings.is_empty() {
        let mut buildings = BTreeMap::new();
        for (building, level) in keyed_buildings.into_iter().chain(state_buildings) {
            buildings.entry(building).or_insert(level);
        }
        entry.buildings = Some(buildings);
    }
    BestEffort::new(entry, diagnostics)
}

impl<'a> HistoryManager<'a, ProvinceHistoryEntry<'a>> {
    /// Validate one province history file and register its entries.
    pub fn load_history_file(
        &mut self,
        catalog: &'a Catalog,
        config: &LoadConfig,
        province: &'a Province,
        root: &Node,
    ) -> Outcome {
        load_dated_history(self, &province.identifier, config, root, |node, other| {
            read_entry(catalog, node, other)
        })
    }

    /// Lock, warning about every land province left without history.
    pub fn lock_histories(&mut self, catalog: &'a Catalog) -> Result<Vec<&'a str>, HistoryError> {
        self.lock(catalog.land_provinces().map(|p| p.identifier.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::Date;
    use crate::error::DiagnosticKind;
    use crate::parser::parse_script;

    const CATALOG: &str = "
countries = { ENG = { color = { 255 0 0 } } FRA = { color = { 0 0 255 } } }
provinces = { 1 = { } 2 = { } 3 = { water = yes } }
buildings = { fort = { max_level = 6 } railroad = { max_level = 5 } }
goods = { grain }
terrain_types = { plains }
ideologies = { conservative liberal }
";

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .load_catalog_file(&parse_script(CATALOG, "catalog.txt").unwrap())
            .unwrap();
        catalog
    }

    fn load<'a>(
        manager: &mut ProvinceHistoryManager<'a>,
        catalog: &'a Catalog,
        province: &str,
        src: &str,
    ) -> Outcome {
        let root = parse_script(src, "history.txt").unwrap();
        let province = catalog.provinces.get(province).unwrap();
        manager.load_history_file(catalog, &LoadConfig::default(), province, &root)
    }

    fn d(y: u16, m: u8, day: u8) -> Date {
        Date::from_ymd(y, m, day)
    }

    #[test]
    fn full_entry_is_read() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(
            &mut manager,
            &catalog,
            "1",
            "owner = ENG\ncontroller = ENG\nadd_core = ENG\ntrade_goods = grain\nlife_rating = 35\n\
             terrain = plains\ncolony = 2\nis_slave = no\nfort = 1\n\
             state_building = { building = railroad level = 2 upgrade = yes }\n\
             party_loyalty = { ideology = liberal loyalty_value = 20 }",
        )
        .unwrap();
        let state = manager.state_at("1", d(1836, 1, 1)).unwrap();
        assert_eq!(state.owner.unwrap().identifier, "ENG");
        assert_eq!(state.trade_goods.unwrap().identifier, "grain");
        assert_eq!(state.life_rating, 35);
        assert_eq!(state.colonial, 2);
        assert!(!state.is_slave);
        let buildings: Vec<_> = state
            .buildings
            .iter()
            .map(|(b, l)| (b.identifier.as_str(), *l))
            .collect();
        assert_eq!(buildings, vec![("fort", 1), ("railroad", 2)]);
        assert_eq!(state.party_loyalties.len(), 1);
        assert!(state.is_core_of(catalog.countries.get("ENG").unwrap()));
    }

    #[test]
    fn building_above_max_level_is_a_range_error() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        let err = load(&mut manager, &catalog, "1", "fort = 7\nbank = 1").unwrap_err();
        let kinds: Vec<_> = err.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::Range, DiagnosticKind::StructuralMismatch]
        );
    }

    #[test]
    fn unknown_country_is_a_reference_error() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        let err = load(&mut manager, &catalog, "1", "owner = XXX").unwrap_err();
        let diag = err.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::Reference);
        assert_eq!(diag.key.as_deref(), Some("owner"));
        assert_eq!(diag.line, Some(1));
    }

    #[test]
    fn cores_granted_twice_are_listed_twice() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "owner = ENG\nadd_core = FRA").unwrap();
        load(&mut manager, &catalog, "1", "owner = ENG\nadd_core = FRA").unwrap();

        let history = manager.get_history("1").unwrap();
        assert_eq!(history.len(), 1);
        let entry = history.get(d(1836, 1, 1)).unwrap();
        assert_eq!(entry.owner.unwrap().identifier, "ENG");
        let cores: Vec<_> = entry.cores.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(cores, vec!["FRA", "FRA"]);
    }

    #[test]
    fn removal_needs_an_existing_core() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        let err = load(
            &mut manager,
            &catalog,
            "1",
            "add_core = ENG\n1840.1.1 = { remove_core = ENG }\n1850.1.1 = { remove_core = FRA }",
        )
        .unwrap_err();
        assert_eq!(err.len(), 1);
        let diag = err.iter().next().unwrap();
        assert_eq!(diag.kind, DiagnosticKind::Consistency);
        assert!(diag.message.contains("FRA") && diag.message.contains("1850.1.1"));

        assert!(manager.state_at("1", d(1839, 1, 1)).unwrap().is_core_of(
            catalog.countries.get("ENG").unwrap()
        ));
        assert!(manager.state_at("1", d(1840, 1, 1)).unwrap().cores.is_empty());
    }

    #[test]
    fn removal_cancels_grant_at_same_date() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "add_core = ENG").unwrap();
        load(&mut manager, &catalog, "1", "remove_core = ENG").unwrap();
        assert!(manager.state_at("1", d(1836, 1, 1)).unwrap().cores.is_empty());
        // nothing left to remove
        assert!(load(&mut manager, &catalog, "1", "remove_core = ENG").is_err());
    }

    #[test]
    fn colonial_and_colony_share_a_slot() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "colony = 1\ncolonial = 2").unwrap();
        assert_eq!(manager.state_at("1", d(1836, 1, 1)).unwrap().colonial, 2);

        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "colonial = 2\ncolony = 1").unwrap();
        assert_eq!(manager.state_at("1", d(1836, 1, 1)).unwrap().colonial, 1);
    }

    #[test]
    fn lock_warns_only_for_land_provinces() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "owner = ENG").unwrap();
        assert_eq!(manager.lock_histories(&catalog).unwrap(), vec!["2"]);
        let err = load(&mut manager, &catalog, "2", "owner = ENG").unwrap_err();
        assert!(err.has_kind(DiagnosticKind::Lifecycle));
        assert!(manager.get_history("2").is_none());
    }

    #[test]
    fn state_renders_as_json() {
        let catalog = catalog();
        let mut manager = ProvinceHistoryManager::new();
        load(&mut manager, &catalog, "1", "owner = ENG\nadd_core = ENG\nfort = 2").unwrap();
        let json = manager.state_at("1", d(1900, 1, 1)).unwrap().to_json_value();
        assert_eq!(json["owner"], "ENG");
        assert!(json["controller"].is_null());
        assert_eq!(json["buildings"]["fort"], 2);
        assert_eq!(json["cores"][0], "ENG");
    }
}
