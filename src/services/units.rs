//! Unit conversion provider: `"<n> <unit> to <unit>"` (also `in`).
//!
//! Every unit is a linear map onto its dimension's base unit,
//! `base = (value + offset) × factor`, which also covers temperature.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::core::{Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::search::{Provider, ProviderKind, SearchContext};

use super::format::format_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Mass,
    Volume,
    Temperature,
    Data,
    Time,
}

#[derive(Debug)]
struct Unit {
    symbol: &'static str,
    dimension: Dimension,
    factor: f64,
    offset: f64,
    aliases: &'static [&'static str],
}

const fn unit(
    symbol: &'static str,
    dimension: Dimension,
    factor: f64,
    aliases: &'static [&'static str],
) -> Unit {
    Unit {
        symbol,
        dimension,
        factor,
        offset: 0.0,
        aliases,
    }
}

static UNITS: &[Unit] = &[
    // Length (base: meter)
    unit("mm", Dimension::Length, 0.001, &["millimeter", "millimeters", "millimetre"]),
    unit("cm", Dimension::Length, 0.01, &["centimeter", "centimeters", "centimetre"]),
    unit("m", Dimension::Length, 1.0, &["meter", "meters", "metre", "metres"]),
    unit("km", Dimension::Length, 1000.0, &["kilometer", "kilometers", "kilometre", "kilometres"]),
    unit("in", Dimension::Length, 0.0254, &["inch", "inches"]),
    unit("ft", Dimension::Length, 0.3048, &["foot", "feet"]),
    unit("yd", Dimension::Length, 0.9144, &["yard", "yards"]),
    unit("mi", Dimension::Length, 1609.344, &["mile", "miles"]),
    unit("nmi", Dimension::Length, 1852.0, &["nautical mile", "nautical miles"]),
    // Mass (base: gram)
    unit("mg", Dimension::Mass, 0.001, &["milligram", "milligrams"]),
    unit("g", Dimension::Mass, 1.0, &["gram", "grams"]),
    unit("kg", Dimension::Mass, 1000.0, &["kilogram", "kilograms", "kilo", "kilos"]),
    unit("t", Dimension::Mass, 1_000_000.0, &["tonne", "tonnes", "ton", "tons"]),
    unit("oz", Dimension::Mass, 28.349_523_125, &["ounce", "ounces"]),
    unit("lb", Dimension::Mass, 453.592_37, &["lbs", "pound", "pounds"]),
    unit("st", Dimension::Mass, 6350.293_18, &["stone", "stones"]),
    // Volume (base: liter)
    unit("ml", Dimension::Volume, 0.001, &["milliliter", "milliliters", "millilitre"]),
    unit("l", Dimension::Volume, 1.0, &["liter", "liters", "litre", "litres"]),
    unit("tsp", Dimension::Volume, 0.004_928_92, &["teaspoon", "teaspoons"]),
    unit("tbsp", Dimension::Volume, 0.014_786_8, &["tablespoon", "tablespoons"]),
    unit("floz", Dimension::Volume, 0.029_573_5, &["fl oz", "fluid ounce", "fluid ounces"]),
    unit("cup", Dimension::Volume, 0.236_588, &["cups"]),
    unit("pt", Dimension::Volume, 0.473_176, &["pint", "pints"]),
    unit("qt", Dimension::Volume, 0.946_353, &["quart", "quarts"]),
    unit("gal", Dimension::Volume, 3.785_41, &["gallon", "gallons"]),
    // Temperature (base: kelvin)
    Unit {
        symbol: "°C",
        dimension: Dimension::Temperature,
        factor: 1.0,
        offset: 273.15,
        aliases: &["c", "celsius", "degc"],
    },
    Unit {
        symbol: "°F",
        dimension: Dimension::Temperature,
        factor: 5.0 / 9.0,
        offset: 459.67,
        aliases: &["f", "fahrenheit", "degf"],
    },
    unit("K", Dimension::Temperature, 1.0, &["kelvin"]),
    // Data (base: byte)
    unit("B", Dimension::Data, 1.0, &["byte", "bytes"]),
    unit("KB", Dimension::Data, 1e3, &["kilobyte", "kilobytes"]),
    unit("MB", Dimension::Data, 1e6, &["megabyte", "megabytes"]),
    unit("GB", Dimension::Data, 1e9, &["gigabyte", "gigabytes"]),
    unit("TB", Dimension::Data, 1e12, &["terabyte", "terabytes"]),
    unit("KiB", Dimension::Data, 1024.0, &["kibibyte", "kibibytes"]),
    unit("MiB", Dimension::Data, 1_048_576.0, &["mebibyte", "mebibytes"]),
    unit("GiB", Dimension::Data, 1_073_741_824.0, &["gibibyte", "gibibytes"]),
    // Time (base: second)
    unit("ms", Dimension::Time, 0.001, &["millisecond", "milliseconds"]),
    unit("s", Dimension::Time, 1.0, &["sec", "secs", "second", "seconds"]),
    unit("min", Dimension::Time, 60.0, &["mins", "minute", "minutes"]),
    unit("h", Dimension::Time, 3600.0, &["hr", "hrs", "hour", "hours"]),
    unit("d", Dimension::Time, 86_400.0, &["day", "days"]),
    unit("wk", Dimension::Time, 604_800.0, &["week", "weeks"]),
    unit("yr", Dimension::Time, 31_556_952.0, &["year", "years"]),
];

/// Lowercased symbol or alias -> unit
static UNIT_INDEX: Lazy<HashMap<String, &'static Unit>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for unit in UNITS {
        index.insert(unit.symbol.to_lowercase(), unit);
        for alias in unit.aliases {
            index.insert(alias.to_string(), unit);
        }
    }
    index
});

fn lookup(name: &str) -> Option<&'static Unit> {
    UNIT_INDEX.get(name.trim().to_lowercase().as_str()).copied()
}

/// A successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from_value: f64,
    pub from_unit: &'static str,
    pub to_value: f64,
    pub to_unit: &'static str,
}

impl Conversion {
    /// "10 km = 6.213712 mi"
    pub fn display(&self) -> String {
        format!(
            "{} {} = {}",
            format_number(self.from_value),
            self.from_unit,
            self.result()
        )
    }

    pub fn result(&self) -> String {
        format!("{} {}", format_number(self.to_value), self.to_unit)
    }
}

/// Parse and convert `"10km to miles"`, `"32 f in c"`, `"5 kg to lb"`.
pub fn convert(query: &str) -> Option<Conversion> {
    let query = query.trim();
    let (from_part, to_part) = query
        .split_once(" to ")
        .or_else(|| query.split_once(" in "))?;

    let (value, from_name) = parse_value_unit(from_part)?;
    let from = lookup(from_name)?;
    let to = lookup(to_part)?;

    if from.dimension != to.dimension {
        return None;
    }

    let base = (value + from.offset) * from.factor;
    let to_value = base / to.factor - to.offset;

    Some(Conversion {
        from_value: value,
        from_unit: from.symbol,
        to_value,
        to_unit: to.symbol,
    })
}

/// Split "10km" or "-3.5 c" into the number and the unit text.
fn parse_value_unit(s: &str) -> Option<(f64, &str)> {
    let s = s.trim();
    let split = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);

    let (number, unit) = s.split_at(split);
    let unit = unit.trim();
    if unit.is_empty() || !number.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((number.parse().ok()?, unit))
}

pub struct UnitProvider;

impl UnitProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for UnitProvider {
    fn name(&self) -> &str {
        "units"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        ctx.query_lower.contains(" to ") || ctx.query_lower.contains(" in ")
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let Some(conversion) = convert(&ctx.query) else {
            return Ok(Vec::new());
        };

        let result = conversion.result();
        Ok(vec![Candidate::new(
            Category::Calculation,
            format!("unit:{}", conversion.display()),
            result.clone(),
            Action::CopyToClipboard(format_number(conversion.to_value)),
        )
        .with_subtitle(conversion.display())
        .with_match_score(1.0)
        .with_alternate(Action::CopyToClipboard(result))])
    }
}
