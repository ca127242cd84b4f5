//! Curated dictionary of raw column aliases, loaded from an embedded CSV table.
//!
//! The table has two columns, `standard_field,alias`. Aliases are compared after
//! [`normalize_column_name`], so `RA_ICRS`, `ra-icrs` and `ra icrs` are one alias.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::StandardField;
use crate::fusion_errors::FusionError;

static DEFAULT_ALIASES: &str = include_str!("data/aliases.csv");

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]").expect("valid static regex"));

static TOKEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid static regex"));

/// Uncertainty, correlation and significance columns (`e_RAJ2000`, `ra_error`, `pmra_pmdec_corr`).
static ERROR_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(e_|err_|sig_|sigma_)|(_?err|_?error|_?sigma|_?unc|_corr|_over_error)$")
        .expect("valid static regex")
});

/// Lower-case a column name and drop everything that is not `[a-z0-9]`.
pub fn normalize_column_name(name: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&name.trim().to_lowercase(), "")
        .into_owned()
}

/// `true` for columns that carry the uncertainty of another quantity.
pub fn is_error_column(name: &str) -> bool {
    ERROR_COLUMN.is_match(&name.trim().to_lowercase())
}

/// Kind of header evidence found for a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AliasMatch {
    Exact,
    /// Partial match; the value is `alias_len / name_len`, in (0, 1).
    Partial(f64),
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    standard_field: String,
    alias: String,
}

/// Alias dictionary: normalized alias → standard field.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, StandardField>,
    /// Aliases per field, in table order, for the partial pass.
    by_field: Vec<(StandardField, Vec<String>)>,
}

impl AliasTable {
    /// The alias table shipped with the crate.
    pub fn builtin() -> Result<Self, FusionError> {
        Self::from_csv(DEFAULT_ALIASES)
    }

    /// Load a `standard_field,alias` CSV table.
    ///
    /// Errors
    /// ------
    /// * [`FusionError::UnknownStandardField`] for a row naming an unknown field.
    /// * [`FusionError::InvalidAliasTable`] for an empty alias or an alias claimed by two fields.
    pub fn from_csv(text: &str) -> Result<Self, FusionError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());

        let mut aliases = HashMap::new();
        let mut by_field: Vec<(StandardField, Vec<String>)> = StandardField::ALL
            .iter()
            .map(|f| (*f, Vec::new()))
            .collect();

        for row in reader.deserialize() {
            let row: AliasRow = row?;
            let field: StandardField = row.standard_field.parse()?;
            let alias = normalize_column_name(&row.alias);
            if alias.is_empty() {
                return Err(FusionError::InvalidAliasTable(format!(
                    "empty alias for field {field}"
                )));
            }
            match aliases.get(&alias) {
                Some(other) if *other != field => {
                    return Err(FusionError::InvalidAliasTable(format!(
                        "alias '{alias}' claimed by both {other} and {field}"
                    )));
                }
                Some(_) => continue,
                None => {}
            }
            aliases.insert(alias.clone(), field);
            if let Some((_, list)) = by_field.iter_mut().find(|(f, _)| *f == field) {
                list.push(alias);
            }
        }

        Ok(AliasTable { aliases, by_field })
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Header evidence for a raw column: at most one match per standard field.
    ///
    /// An exact match on the normalized name wins outright. Otherwise, for each field the best
    /// partial match is kept, where an alias matches partially when it is
    ///
    /// * a whole token of the raw name (`ICRS_ra` → `ra`),
    /// * a prefix or suffix of the normalized name, for aliases of 3 characters or more,
    /// * contained in the normalized name, for aliases of 4 characters or more.
    ///
    /// Error columns never match.
    pub fn lookup(&self, raw_column: &str) -> Vec<(StandardField, AliasMatch, String)> {
        if is_error_column(raw_column) {
            return Vec::new();
        }
        let name = normalize_column_name(raw_column);
        if name.is_empty() {
            return Vec::new();
        }
        if let Some(field) = self.aliases.get(&name) {
            return vec![(*field, AliasMatch::Exact, name)];
        }

        let lowered = raw_column.trim().to_lowercase();
        let tokens: Vec<&str> = TOKEN_SPLIT
            .split(&lowered)
            .filter(|t| !t.is_empty())
            .collect();

        let mut matches = Vec::new();
        for (field, aliases) in &self.by_field {
            let best = aliases
                .iter()
                .filter(|alias| {
                    tokens.iter().any(|t| t == alias)
                        || (alias.len() >= 3 && (name.starts_with(*alias) || name.ends_with(*alias)))
                        || (alias.len() >= 4 && name.contains(*alias))
                })
                .map(|alias| (alias.len() as f64 / name.len() as f64, alias))
                // first alias in table order wins on equal ratios
                .fold(None::<(f64, &String)>, |acc, cur| match acc {
                    Some(a) if a.0 >= cur.0 => Some(a),
                    _ => Some(cur),
                });
            if let Some((ratio, alias)) = best {
                matches.push((*field, AliasMatch::Partial(ratio.min(1.0)), alias.clone()));
            }
        }
        matches
    }
}
