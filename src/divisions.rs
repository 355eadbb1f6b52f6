use crate::models::{FeatureLevel, GeoRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Region and department names of one country, plus which region each
/// department belongs to. Keys are admin codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionTable {
    pub department_to_region: BTreeMap<String, String>,
    pub departments: BTreeMap<String, String>,
    pub regions: BTreeMap<String, String>,
}

impl DivisionTable {
    /// Builds the table from the ADM1/ADM2 records of `country`. A later record
    /// with the same code overwrites an earlier one.
    pub fn build<'a, I>(records: I, country: &str) -> Self
    where
        I: IntoIterator<Item = &'a GeoRecord>,
    {
        let mut table = Self::default();
        for record in records {
            if record.country_code != country {
                continue;
            }
            match record.level() {
                Some(FeatureLevel::Adm1) => {
                    table
                        .regions
                        .insert(record.admin1_code.clone(), record.name.clone());
                }
                Some(FeatureLevel::Adm2) => {
                    table
                        .departments
                        .insert(record.admin2_code.clone(), record.name.clone());
                    table
                        .department_to_region
                        .insert(record.admin2_code.clone(), record.admin1_code.clone());
                }
                _ => {}
            }
        }
        table
    }

    pub fn region_of(&self, department: &str) -> Option<&str> {
        self.department_to_region.get(department).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.departments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FromFields;

    fn rec(name: &str, code: &str, country: &str, admin1: &str, admin2: &str) -> GeoRecord {
        GeoRecord::parse(&format!(
            "1\t{name}\t{name}\t\t0\t0\tA\t{code}\t{country}\t\t{admin1}\t{admin2}\t\t\t\t\t\tEurope/Paris\t2020-01-01"
        ))
        .unwrap()
    }

    #[test]
    fn builds_region_and_department_maps() {
        let records = vec![
            rec("Île-de-France", "ADM1", "FR", "11", ""),
            rec("Paris", "ADM2", "FR", "11", "75"),
            rec("Hauts-de-Seine", "ADM2", "FR", "11", "92"),
            rec("Auvergne-Rhône-Alpes", "ADM1", "FR", "84", ""),
            rec("Rhône", "ADM2", "FR", "84", "69"),
            rec("Paris", "ADM4", "FR", "11", "75"),
        ];
        let table = DivisionTable::build(&records, "FR");

        assert_eq!(table.regions.len(), 2);
        assert_eq!(table.regions["11"], "Île-de-France");
        assert_eq!(table.departments.len(), 3);
        assert_eq!(table.departments["69"], "Rhône");
        assert_eq!(table.region_of("92"), Some("11"));
        assert_eq!(table.region_of("69"), Some("84"));
        assert_eq!(table.region_of("2A"), None);
    }

    #[test]
    fn ignores_other_countries() {
        let records = vec![
            rec("Bern", "ADM1", "CH", "BE", ""),
            rec("Bretagne", "ADM1", "FR", "53", ""),
        ];
        let table = DivisionTable::build(&records, "FR");
        assert_eq!(table.regions.keys().collect::<Vec<_>>(), vec!["53"]);
        assert!(DivisionTable::build(&records, "DE").is_empty());
    }

    #[test]
    fn later_record_overwrites_earlier() {
        let records = vec![
            rec("Old Name", "ADM2", "FR", "11", "75"),
            rec("Paris", "ADM2", "FR", "11", "75"),
        ];
        let table = DivisionTable::build(&records, "FR");
        assert_eq!(table.departments["75"], "Paris");
    }
}
