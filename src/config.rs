/// Countries with fewer localities than this after a pass are re-resolved one level up
pub const MIN_LOCALITIES_PER_COUNTRY: usize = 10;

/// Column count of the place gazetteer (`allCountries.txt`, `FR.txt`, ...)
pub const GAZETTEER_COLUMNS: usize = 19;

/// Postal rows need everything up to longitude; accuracy is optional
pub const POSTAL_MIN_COLUMNS: usize = 11;

/// Lines between progress spinner ticks
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Bump when `GeoRecord` or the cache layout changes
pub const CACHE_VERSION: u32 = 2;

pub const CACHE_FILE_NAME: &str = "admin_index.cache";

/// Buffer size for JSON output writers
pub const WRITE_BUFFER_SIZE: usize = 256 * 1024;

pub const DEFAULT_GAZETTEER_PATH: &str = "data/allCountries.txt";
pub const DEFAULT_POSTAL_PATH: &str = "data/zip-codes.txt";
pub const DEFAULT_TOWNS_OUTPUT: &str = "data/all_towns.json";
pub const DEFAULT_ZIP_OUTPUT: &str = "data/zip_codes.json";
pub const DEFAULT_DIVISIONS_OUTPUT: &str = "data/divisions.json";

pub const GAZETTEER_DOWNLOAD_URL: &str = "https://download.geonames.org/export/dump/allCountries.zip";
pub const POSTAL_DOWNLOAD_URL: &str = "https://download.geonames.org/export/zip/allCountries.zip";
