use crate::models::{CountryLocalityMap, Locality};

/// Partitions localities by country code, keeping input order within each country.
pub fn group_by_country<I>(localities: I) -> CountryLocalityMap
where
    I: IntoIterator<Item = Locality>,
{
    let mut grouped = CountryLocalityMap::new();
    for locality in localities {
        grouped
            .entry(locality.country_code.clone())
            .or_default()
            .push(locality);
    }
    grouped
}
