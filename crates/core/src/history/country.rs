use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

use super::load::{load_dated_history, OtherKeys};
use super::{overwrite, HistoryEntry, HistoryManager, MissingDelta};
use crate::ast::Node;
use crate::catalog::{Catalog, Country, Definition, Province, Reform};
use crate::config::LoadConfig;
use crate::date::Date;
use crate::error::{BestEffort, Diagnostic, Diagnostics, HistoryError, Outcome};
use crate::validate::{
    assign_opt, expect_bool, expect_date, expect_dictionary, expect_fixed_point,
    expect_identifier, push, Cardinality, KeySchema,
};

pub type CountryHistoryManager<'a> = HistoryManager<'a, CountryHistoryEntry<'a>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryHistoryEntry<'a> {
    pub primary_culture: Option<&'a Definition>,
    /// Delta: cultures accepted from this date on.
    pub accepted_cultures: Vec<&'a Definition>,
    pub religion: Option<&'a Definition>,
    pub government: Option<&'a Definition>,
    /// One of the country's own parties.
    pub ruling_party: Option<&'a str>,
    /// Delta: each reform replaces the current one of its group.
    pub reforms: Vec<&'a Reform>,
    pub plurality: Option<Decimal>,
    pub prestige: Option<Decimal>,
    pub national_value: Option<&'a Definition>,
    pub civilized: Option<bool>,
    pub capital: Option<&'a Province>,
    pub last_election: Option<Date>,
    /// Replaces the whole upper house when set.
    pub upper_house: Option<BTreeMap<&'a Definition, Decimal>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryState<'a> {
    pub primary_culture: Option<&'a Definition>,
    pub accepted_cultures: Vec<&'a Definition>,
    pub religion: Option<&'a Definition>,
    pub government: Option<&'a Definition>,
    pub ruling_party: Option<&'a str>,
    /// Current reform of each reform group.
    pub reforms: BTreeMap<&'a str, &'a Reform>,
    pub plurality: Decimal,
    pub prestige: Decimal,
    pub national_value: Option<&'a Definition>,
    pub civilized: bool,
    pub capital: Option<&'a Province>,
    pub last_election: Option<Date>,
    pub upper_house: BTreeMap<&'a Definition, Decimal>,
}

impl<'a> CountryState<'a> {
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "primary_culture": self.primary_culture.map(|c| c.identifier.as_str()),
            "accepted_cultures": self
                .accepted_cultures
                .iter()
                .map(|c| c.identifier.as_str())
                .collect::<Vec<_>>(),
            "religion": self.religion.map(|r| r.identifier.as_str()),
            "government": self.government.map(|g| g.identifier.as_str()),
            "ruling_party": self.ruling_party,
            "reforms": self
                .reforms
                .iter()
                .map(|(group, reform)| (*group, reform.identifier.as_str()))
                .collect::<BTreeMap<_, _>>(),
            "plurality": self.plurality.to_string(),
            "prestige": self.prestige.to_string(),
            "national_value": self.national_value.map(|v| v.identifier.as_str()),
            "civilized": self.civilized,
            "capital": self.capital.map(|p| p.identifier.as_str()),
            "last_election": self.last_election.map(|d| d.to_string()),
            "upper_house": self
                .upper_house
                .iter()
                .map(|(i, share)| (i.identifier.as_str(), share.to_string()))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

impl fmt::Display for CountryState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_none<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "none".to_owned(), |v| v.to_string())
        }
        writeln!(f, "primary_culture: {}", or_none(self.primary_culture))?;
        let accepted: Vec<_> = self
            .accepted_cultures
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        writeln!(f, "accepted_cultures: {}", accepted.join(" "))?;
        writeln!(f, "religion: {}", or_none(self.religion))?;
        writeln!(f, "government: {}", or_none(self.government))?;
        writeln!(f, "ruling_party: {}", or_none(self.ruling_party))?;
        for (group, reform) in &self.reforms {
            writeln!(f, "reform {}: {}", group, reform)?;
        }
        writeln!(f, "plurality: {}", self.plurality)?;
        writeln!(f, "prestige: {}", self.prestige)?;
        writeln!(f, "national_value: {}", or_none(self.national_value))?;
        writeln!(f, "civilized: {}", self.civilized)?;
        writeln!(f, "capital: {}", or_none(self.capital))?;
        write!(f, "last_election: {}", or_none(self.last_election))?;
        for (ideology, share) in &self.upper_house {
            write!(f, "\nupper_house {}: {}", ideology, share)?;
        }
        Ok(())
    }
}

impl<'a> HistoryEntry for CountryHistoryEntry<'a> {
    type State = CountryState<'a>;
    const KIND: &'static str = "country";

    fn apply(&self, state: &mut CountryState<'a>) {
        if self.primary_culture.is_some() {
            state.primary_culture = self.primary_culture;
        }
        state.accepted_cultures.extend(&self.accepted_cultures);
        if self.religion.is_some() {
            state.religion = self.religion;
        }
        if self.government.is_some() {
            state.government = self.government;
        }
        if self.ruling_party.is_some() {
            state.ruling_party = self.ruling_party;
        }
        for &reform in &self.reforms {
            state.reforms.insert(reform.group.as_str(), reform);
        }
        if let Some(plurality) = self.plurality {
            state.plurality = plurality;
        }
        if let Some(prestige) = self.prestige {
            state.prestige = prestige;
        }
        if self.national_value.is_some() {
            state.national_value = self.national_value;
        }
        if let Some(civilized) = self.civilized {
            state.civilized = civilized;
        }
        if self.capital.is_some() {
            state.capital = self.capital;
        }
        if self.last_election.is_some() {
            state.last_election = self.last_election;
        }
        if let Some(upper_house) = &self.upper_house {
            state.upper_house = upper_house.clone();
        }
    }

    fn absorb(&mut self, newer: Self, _before: &CountryState<'a>) -> Result<(), MissingDelta> {
        overwrite(&mut self.primary_culture, newer.primary_culture);
        self.accepted_cultures.extend(newer.accepted_cultures);
        overwrite(&mut self.religion, newer.religion);
        overwrite(&mut self.government, newer.government);
        overwrite(&mut self.ruling_party, newer.ruling_party);
        self.reforms.extend(newer.reforms);
        overwrite(&mut self.plurality, newer.plurality);
        overwrite(&mut self.prestige, newer.prestige);
        overwrite(&mut self.national_value, newer.national_value);
        overwrite(&mut self.civilized, newer.civilized);
        overwrite(&mut self.capital, newer.capital);
        overwrite(&mut self.last_election, newer.last_election);
        overwrite(&mut self.upper_house, newer.upper_house);
        Ok(())
    }
}

fn expect_capital<'a>(catalog: &'a Catalog, node: &Node) -> Outcome<&'a Province> {
    let province = catalog.provinces.expect_item(node)?;
    if province.is_water {
        return Err(Diagnostic::range(format!(
            "capital province {} is a water province",
            province
        ))
        .at_line(node.line)
        .into());
    }
    Ok(province)
}

fn expect_party<'a>(country: &'a Country, node: &Node) -> Outcome<&'a str> {
    let name = expect_identifier(node)?;
    country
        .parties
        .iter()
        .find(|p| *p == name)
        .map(String::as_str)
        .ok_or_else(|| {
            Diagnostic::reference(format!("country {} has no party '{}'", country, name))
                .at_line(node.line)
                .into()
        })
}

/// A reform named under its group's key, e.g. `slavery = yes_slavery`.
fn expect_reform<'a>(
    catalog: &'a Catalog,
    group: &Definition,
    node: &Node,
) -> Outcome<&'a Reform> {
    let reform = catalog.reforms.expect_item(node)?;
    if reform.group != group.identifier {
        return Err(Diagnostic::reference(format!(
            "reform {} belongs to {}, not {}",
            reform, reform.group, group
        ))
        .at_line(node.line)
        .into());
    }
    Ok(reform)
}

/// Read one block of a country history file.
pub(crate) fn read_entry<'a, 'n>(
    catalog: &'a Catalog,
    country: &'a Country,
    node: &'n Node,
    other: &mut OtherKeys<'n, '_>,
) -> BestEffort<CountryHistoryEntry<'a>> {
    let mut entry = CountryHistoryEntry::default();
    let mut upper_house = BTreeMap::new();
    let mut has_upper_house = false;
    let mut reforms = Vec::new();
    let mut diagnostics = Diagnostics::new();

    let cultures = move |n: &Node| catalog.cultures.expect_item(n);
    let once = Cardinality::ZeroOrOne;
    diagnostics.record(
        KeySchema::new()
            .key("primary_culture", once, assign_opt(&mut entry.primary_culture, cultures))
            .key(
                "culture",
                Cardinality::ZeroOrMore,
                push(&mut entry.accepted_cultures, cultures),
            )
            .key(
                "religion",
                once,
                assign_opt(&mut entry.religion, move |n: &Node| catalog.religions.expect_item(n)),
            )
            .key(
                "government",
                once,
                assign_opt(&mut entry.government, move |n: &Node| {
                    catalog.governments.expect_item(n)
                }),
            )
            .key(
                "ruling_party",
                once,
                assign_opt(&mut entry.ruling_party, move |n: &Node| expect_party(country, n)),
            )
            .key("plurality", once, assign_opt(&mut entry.plurality, expect_fixed_point))
            .key("prestige", once, assign_opt(&mut entry.prestige, expect_fixed_point))
            .key(
                "nationalvalue",
                once,
                assign_opt(&mut entry.national_value, move |n: &Node| {
                    catalog.national_values.expect_item(n)
                }),
            )
            .key("civilized", once, assign_opt(&mut entry.civilized, expect_bool))
            .key(
                "capital",
                once,
                assign_opt(&mut entry.capital, move |n: &Node| expect_capital(catalog, n)),
            )
            .key("last_election", once, assign_opt(&mut entry.last_election, expect_date))
            .key("upper_house", once, |node| {
                has_upper_house = true;
                expect_dictionary(node, |key, value| {
                    let ideology = catalog
                        .ideologies
                        .expect_item_str(key)
                        .map_err(|d| d.at_line(value.line))?;
                    upper_house.insert(ideology, expect_fixed_point(value)?);
                    Ok(())
                })
            })
            .fallback(|key, value| match catalog.reform_groups.get(key) {
                Some(group) => {
                    reforms.push(expect_reform(catalog, group, value)?);
                    Ok(())
                }
                None => other(key, value),
            })
            .validate(node),
    );

    entry.reforms = reforms;
    if has_upper_house {
        entry.upper_house = Some(upper_house);
    }
    BestEffort::new(entry, diagnostics)
}

impl<'a> HistoryManager<'a, CountryHistoryEntry<'a>> {
    /// Validate one country history file and register its entries.
    pub fn load_history_file(
        &mut self,
        catalog: &'a Catalog,
        config: &LoadConfig,
        country: &'a Country,
        root: &Node,
    ) -> Outcome {
        load_dated_history(self, &country.identifier, config, root, |node, other| {
            read_entry(catalog, country, node, other)
        })
    }

    /// Lock, warning about every country left without history.
    pub fn lock_histories(&mut self, catalog: &'a Catalog) -> Result<Vec<&'a str>, HistoryError> {
        self.lock(catalog.countries.iter().map(|c| c.identifier.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::parser::parse_script;

    const CATALOG: &str = "
countries = {
    ENG = { color = { 255 0 0 } party = ENG_conservative party = ENG_liberal }
    FRA = { color = { 0 0 255 } party = FRA_liberal }
}
provinces = { 300 = { } 301 = { water = yes } }
cultures = { british scottish irish }
religions = { protestant }
governments = { hms_government }
national_values = { nv_liberty }
ideologies = { conservative liberal }
reforms = { slavery = { yes_slavery no_slavery } press_rights = { censored_press free_press } }
";

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .load_catalog_file(&parse_script(CATALOG, "catalog.txt").unwrap())
            .unwrap();
        catalog
    }

    fn load<'a>(
        manager: &mut CountryHistoryManager<'a>,
        catalog: &'a Catalog,
        src: &str,
    ) -> Outcome {
        let root = parse_script(src, "ENG - England.txt").unwrap();
        let country = catalog.countries.get("ENG").unwrap();
        manager.load_history_file(catalog, &LoadConfig::default(), country, &root)
    }

    fn d(y: u16, m: u8, day: u8) -> Date {
        Date::from_ymd(y, m, day)
    }

    #[test]
    fn reads_every_field() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        load(
            &mut manager,
            &catalog,
            "capital = 300\nprimary_culture = british\nculture = scottish\nreligion = protestant\n\
             government = hms_government\nplurality = 25.0\nprestige = 45\nnationalvalue = nv_liberty\n\
             civilized = yes\nlast_election = 1835.6.1\nupper_house = { conservative = 0.6 liberal = 0.4 }\n\
             1861.1.1 = { culture = irish prestige = 50 }",
        )
        .unwrap();

        let early = manager.state_at("ENG", d(1850, 1, 1)).unwrap();
        assert_eq!(early.capital.unwrap().identifier, "300");
        assert_eq!(early.plurality, Decimal::new(250, 1));
        assert_eq!(early.prestige, Decimal::from(45));
        assert!(early.civilized);
        assert_eq!(early.last_election, Some(d(1835, 6, 1)));
        assert_eq!(early.upper_house.len(), 2);

        let late = manager.state_at("ENG", d(1870, 1, 1)).unwrap();
        let accepted: Vec<_> = late
            .accepted_cultures
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        assert_eq!(accepted, vec!["scottish", "irish"]);
        assert_eq!(late.prestige, Decimal::from(50));
        assert_eq!(late.religion.unwrap().identifier, "protestant");
    }

    #[test]
    fn water_capital_and_unknown_ideology_are_reported() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        let err = load(
            &mut manager,
            &catalog,
            "capital = 301\nupper_house = { anarchist = 1.0 }\nprimary_culture = british",
        )
        .unwrap_err();
        let kinds: Vec<_> = err.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Range, DiagnosticKind::Reference]);
        let reference = err.iter().nth(1).unwrap();
        assert_eq!(reference.key.as_deref(), Some("anarchist"));
        // the rest of the entry is still registered
        let state = manager.state_at("ENG", d(1836, 1, 1)).unwrap();
        assert_eq!(state.primary_culture.unwrap().identifier, "british");
        assert!(state.capital.is_none());
    }

    #[test]
    fn ruling_party_and_reforms() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        load(
            &mut manager,
            &catalog,
            "ruling_party = ENG_conservative
slavery = no_slavery
press_rights = censored_press
             1848.1.1 = { ruling_party = ENG_liberal press_rights = free_press }",
        )
        .unwrap();

        let early = manager.state_at("ENG", d(1840, 1, 1)).unwrap();
        assert_eq!(early.ruling_party, Some("ENG_conservative"));
        assert_eq!(early.reforms["press_rights"].identifier, "censored_press");

        let late = manager.state_at("ENG", d(1850, 1, 1)).unwrap();
        assert_eq!(late.ruling_party, Some("ENG_liberal"));
        let reforms: Vec<_> = late
            .reforms
            .iter()
            .map(|(group, reform)| (*group, reform.identifier.as_str()))
            .collect();
        assert_eq!(
            reforms,
            vec![("press_rights", "free_press"), ("slavery", "no_slavery")]
        );
        let json = late.to_json_value();
        assert_eq!(json["ruling_party"], "ENG_liberal");
        assert_eq!(json["reforms"]["slavery"], "no_slavery");
    }

    #[test]
    fn foreign_party_and_misplaced_reform_are_reference_errors() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        let err = load(
            &mut manager,
            &catalog,
            "ruling_party = FRA_liberal
slavery = free_press
primary_culture = british",
        )
        .unwrap_err();
        let summary: Vec<_> = err.iter().map(|d| (d.kind, d.key.as_deref())).collect();
        assert_eq!(
            summary,
            vec![
                (DiagnosticKind::Reference, Some("ruling_party")),
                (DiagnosticKind::Reference, Some("slavery")),
            ]
        );
        let state = manager.state_at("ENG", d(1836, 1, 1)).unwrap();
        assert!(state.ruling_party.is_none() && state.reforms.is_empty());
        assert_eq!(state.primary_culture.unwrap().identifier, "british");
    }

    #[test]
    fn lock_reports_countries_without_history() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        load(&mut manager, &catalog, "civilized = yes").unwrap();
        assert_eq!(manager.lock_histories(&catalog).unwrap(), vec!["FRA"]);
    }

    #[test]
    fn json_renders_decimals_as_text() {
        let catalog = catalog();
        let mut manager = CountryHistoryManager::new();
        load(&mut manager, &catalog, "prestige = 12.5").unwrap();
        let json = manager.state_at("ENG", d(1836, 1, 1)).unwrap().to_json_value();
        assert_eq!(json["prestige"], "12.5");
        assert!(json["capital"].is_null());
    }
}
