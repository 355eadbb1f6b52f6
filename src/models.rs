use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Country code -> localities, sorted by country code.
pub type CountryLocalityMap = BTreeMap<String, Vec<Locality>>;

/// One row of the place gazetteer, in source column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub geonameid: u64,
    pub name: String,
    pub asciiname: String,
    pub alternatenames: String,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: String,
    pub feature_code: String,
    pub country_code: String,
    pub cc2: String,
    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,
    pub population: u64,
    pub elevation: i32,
    pub dem: String,
    pub timezone: String,
    pub modification_date: String,
}

impl GeoRecord {
    pub fn level(&self) -> Option<FeatureLevel> {
        FeatureLevel::from_code(&self.feature_code)
    }
}

/// One row of the postal-code gazetteer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostalRow {
    pub country_code: String,
    pub postal_code: String,
    pub place_name: String,
    pub admin_name1: String,
    pub admin_code1: String,
    pub admin_name2: String,
    pub admin_code2: String,
    pub admin_name3: String,
    pub admin_code3: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 1 = estimated, 4 = geonameid, 6 = centroid of addresses or shape
    pub accuracy: Option<u8>,
}

impl PostalRow {
    /// Rebuilds a row from a normalized locality. Admin names and codes are not
    /// carried by `Locality` and come back empty.
    pub fn from_locality(locality: &Locality) -> Self {
        Self {
            country_code: locality.country_code.clone(),
            postal_code: locality.code.clone(),
            place_name: locality.name.clone(),
            latitude: locality.latitude,
            longitude: locality.longitude,
            ..Self::default()
        }
    }

    /// Renders the row back to its 12-column tab-separated form.
    pub fn to_line(&self) -> String {
        let opt_f64 = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        [
            self.country_code.clone(),
            self.postal_code.clone(),
            self.place_name.clone(),
            self.admin_name1.clone(),
            self.admin_code1.clone(),
            self.admin_name2.clone(),
            self.admin_code2.clone(),
            self.admin_name3.clone(),
            self.admin_code3.clone(),
            opt_f64(self.latitude),
            opt_f64(self.longitude),
            self.accuracy.map(|a| a.to_string()).unwrap_or_default(),
        ]
        .join("\t")
    }
}

/// Administrative division levels, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureLevel {
    /// Region / state
    Adm1,
    /// County / department
    Adm2,
    Adm3,
    /// Commune
    Adm4,
}

/// Finest first. Escalation never goes past the last entry.
pub const ESCALATION_LEVELS: [FeatureLevel; 3] =
    [FeatureLevel::Adm4, FeatureLevel::Adm3, FeatureLevel::Adm2];

impl FeatureLevel {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ADM1" => Some(FeatureLevel::Adm1),
            "ADM2" => Some(FeatureLevel::Adm2),
            "ADM3" => Some(FeatureLevel::Adm3),
            "ADM4" => Some(FeatureLevel::Adm4),
            _ => None,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            FeatureLevel::Adm1 => "ADM1",
            FeatureLevel::Adm2 => "ADM2",
            FeatureLevel::Adm3 => "ADM3",
            FeatureLevel::Adm4 => "ADM4",
        }
    }

    /// The next level up the hierarchy, `None` for ADM1.
    pub fn coarser(&self) -> Option<Self> {
        match self {
            FeatureLevel::Adm1 => None,
            FeatureLevel::Adm2 => Some(FeatureLevel::Adm1),
            FeatureLevel::Adm3 => Some(FeatureLevel::Adm2),
            FeatureLevel::Adm4 => Some(FeatureLevel::Adm3),
        }
    }

    /// The record's admin code field belonging to this level.
    pub fn admin_code<'a>(&self, record: &'a GeoRecord) -> &'a str {
        match self {
            FeatureLevel::Adm1 => &record.admin1_code,
            FeatureLevel::Adm2 => &record.admin2_code,
            FeatureLevel::Adm3 => &record.admin3_code,
            FeatureLevel::Adm4 => &record.admin4_code,
        }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A resolved place: one name mapped to one postal or administrative code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locality {
    #[serde(rename = "geonameid", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_code: Option<String>,
    pub country_code: String,
    /// Never empty
    #[serde(rename = "zip_code")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Locality {
    pub fn from_record(record: &GeoRecord, code: String) -> Self {
        Self {
            id: Some(record.geonameid),
            name: record.name.clone(),
            feature_code: Some(record.feature_code.clone()),
            country_code: record.country_code.clone(),
            code,
            latitude: Some(record.latitude),
            longitude: Some(record.longitude),
        }
    }

    pub fn from_postal(row: &PostalRow, name: String, code: String) -> Self {
        Self {
            id: None,
            name,
            feature_code: None,
            country_code: row.country_code.trim().to_string(),
            code,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}
