//! geonorm: GeoNames gazetteer normalization
//!
//! This crate turns two GeoNames dumps into per-country locality tables:
//!
//! 1. **Towns** -- From the place gazetteer (`allCountries.txt`), pick for each country
//!    the finest administrative level (ADM4, then ADM3, then ADM2) that yields at least
//!    [`config::MIN_LOCALITIES_PER_COUNTRY`] localities, and map each division to its
//!    admin code
//! 2. **Zip codes** -- From the postal-code gazetteer, drop qualified codes such as
//!    `75001 CEDEX`, strip district numbers from place names and keep one locality per
//!    (country, code, name)
//! 3. **Divisions** -- For one country, build region and department lookup tables
//!
//! Each run is a full batch recomputation over a static snapshot; outputs are JSON
//! documents keyed by two-letter country code.
//!
//! # Escalation
//!
//! Some gazetteers are sparse at commune level. After each resolution pass, countries
//! with too few localities are resolved again one level up and their result is
//! *replaced* by the coarser one, even when it is smaller. There is no escalation past
//! ADM2.
//!
//! # Key Modules
//!
//! - [`parser`] -- Tab-separated record parsing and streaming
//! - [`index`] -- Single-pass admin division index over the gazetteer
//! - [`resolve`] -- Per-level resolution and threshold-driven escalation
//! - [`normalize`] -- Postal-code filtering, name cleanup and deduplication
//! - [`group`] -- Country partitioning
//! - [`divisions`] -- Region / department lookup tables
//! - [`cache`] -- Admin index snapshots keyed on the input file and malformed-line policy
//! - [`output`] -- Atomic JSON output
//! - [`pipeline`] -- End-to-end runs used by the CLI
//! - [`models`] -- Core data types (GeoRecord, PostalRow, FeatureLevel, Locality)
//! - [`stats`] -- Read and normalization counters, per-country summaries
//! - [`error`] -- Error types
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! # Localities for every country, cached admin index next to the output
//! geonorm towns -i data/allCountries.txt -o data/all_towns.json
//!
//! # Postal codes for France only
//! geonorm zip-codes -i data/zip-codes.txt -o data/zip_fr.json --countries FR
//!
//! # Region/department tables from a single-country dump
//! geonorm divisions -i data/FR.txt -c FR -o data/divisions_fr.json
//! ```

pub mod cache;
pub mod config;
pub mod divisions;
pub mod error;
pub mod group;
pub mod index;
pub mod models;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod stats;
