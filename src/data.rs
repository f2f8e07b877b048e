use serde::Deserialize;
use serde_json::from_slice;
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error;
use tracing::{info, warn};

use crate::iso::Alpha2;

pub const COUNTRY_INFO_FILE: &str = "country_info.json";

/// Dane o kraju ładowane z country_info.json
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CountryInfo {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid country catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Metadane krajów wg kodu alpha-2.
#[derive(Clone, Debug, Default)]
pub struct CountryCatalog {
    countries: BTreeMap<Alpha2, CountryInfo>,
}

impl CountryCatalog {
    /// Brak pliku lub zły plik to pusty katalog (strona kraju pokaże tylko kształt).
    pub fn load<P: AsRef<Path>>(dir: P) -> Self {
        match Self::read(dir.as_ref()) {
            Ok(catalog) => {
                info!(countries = catalog.len(), "country catalog loaded");
                catalog
            }
            Err(error) => {
                warn!(%error, "country catalog unavailable, continuing without metadata");
                Self::default()
            }
        }
    }

    pub fn read(dir: &Path) -> Result<Self, CatalogError> {
        let path = dir.join(COUNTRY_INFO_FILE);
        let bytes = fs::read(&path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Klucze, które nie są kodem alpha-2, są pomijane.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, CountryInfo> = from_slice(bytes)?;
        let mut countries = BTreeMap::new();
        for (key, info) in raw {
            match key.parse::<Alpha2>() {
                Ok(code) => {
                    countries.insert(code, info);
                }
                Err(e) => warn!(%key, error = %e, "catalog entry skipped"),
            }
        }
        Ok(Self { countries })
    }

    pub fn get(&self, code: Alpha2) -> Option<&CountryInfo> {
        self.countries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Separator tysięcy: 83240525 → "83,240,525".
pub fn format_population(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_area(km2: f64) -> String {
    if km2 >= 1_000_000.0 {
        format!("{:.2} mln km²", km2 / 1_000_000.0)
    } else if km2 >= 1_000.0 {
        format!("{} km²", format_population(km2.round() as u64))
    } else {
        format!("{:.1} km²", km2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_has_thousands_separators() {
        assert_eq!(format_population(0), "0");
        assert_eq!(format_population(999), "999");
        assert_eq!(format_population(1_000), "1,000");
        assert_eq!(format_population(83_240_525), "83,240,525");
        assert_eq!(format_population(331_002_651), "331,002,651");
    }

    #[test]
    fn area_switches_units() {
        assert_eq!(format_area(9_833_520.0), "9.83 mln km²");
        assert_eq!(format_area(357_022.0), "357,022 km²");
        assert_eq!(format_area(2.02), "2.0 km²");
    }

    #[test]
    fn catalog_is_keyed_by_code() {
        let json = br#"{
            "de": { "name": "Germany", "region": "Europe", "capital": "Berlin", "population": 83240525 },
            "FR": { "name": "France" },
            "France": { "name": "bad key" }
        }"#;
        let catalog = CountryCatalog::from_slice(json).unwrap();
        assert_eq!(catalog.len(), 2);

        let de = catalog.get("DE".parse().unwrap()).unwrap();
        assert_eq!(de.capital.as_deref(), Some("Berlin"));
        assert_eq!(de.population, Some(83_240_525));
        assert_eq!(catalog.get("FR".parse().unwrap()).unwrap().region, None);
    }

    #[test]
    fn missing_file_is_empty_catalog() {
        let catalog = CountryCatalog::load("definitely/not/here");
        assert!(catalog.is_empty());
        assert!(matches!(
            CountryCatalog::read(Path::new("definitely/not/here")),
            Err(CatalogError::Io { .. })
        ));
    }
}
