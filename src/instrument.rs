//! Instrument metadata and the symbol registry.
//!
//! Instruments are loaded once at startup from a JSON array of flat objects
//! (`symbol`, `description`, `tick_size`, `lot_size`, `price_scale`) and are
//! read-only afterwards. `tick_size` appears in the file as a decimal
//! (e.g. `0.01`) and is converted to fixed point with that instrument's own
//! `price_scale` — the single scaled-decimal rule for every decimal the
//! engine accepts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::order::{Price, Qty};

/// Errors raised while loading the instrument file.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read instrument file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse instrument file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Static metadata for one tradable instrument.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub description: String,
    /// Minimum price increment, in fixed point (0.01 at scale 10000 is 100).
    pub tick_size: Price,
    /// Minimum quantity increment.
    pub lot_size: Qty,
    /// Fixed-point multiplier for prices of this instrument.
    pub price_scale: i64,
}

impl Instrument {
    /// Whether a fixed-point price lands on this instrument's tick grid.
    pub fn is_valid_price(&self, price: Price) -> bool {
        self.tick_size <= 0 || price % self.tick_size == 0
    }

    /// Whether a quantity is a whole number of lots.
    pub fn is_valid_qty(&self, qty: Qty) -> bool {
        self.lot_size == 0 || qty % self.lot_size == 0
    }
}

/// On-disk shape of one instrument entry. All fields are optional; entries
/// without a symbol are skipped.
#[derive(Debug, Deserialize)]
struct InstrumentRecord {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tick_size: f64,
    #[serde(default)]
    lot_size: Qty,
    #[serde(default)]
    price_scale: i64,
}

impl From<InstrumentRecord> for Instrument {
    fn from(record: InstrumentRecord) -> Self {
        let tick_size = (record.tick_size * record.price_scale as f64).round() as Price;
        Instrument {
            symbol: record.symbol,
            description: record.description,
            tick_size,
            lot_size: record.lot_size,
            price_scale: record.price_scale,
        }
    }
}

/// Read-only lookup from symbol to instrument metadata.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    instruments: HashMap<String, Instrument>,
}

impl InstrumentRegistry {
    /// Load the registry from a JSON instrument file.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse a registry from raw JSON contents.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<InstrumentRecord> = serde_json::from_str(contents)?;
        let mut registry = InstrumentRegistry::default();
        for record in records {
            if record.symbol.is_empty() {
                continue;
            }
            registry.insert(record.into());
        }
        Ok(registry)
    }

    /// Register an instrument directly. Startup and test wiring only; the
    /// registry never changes while the engine serves requests.
    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments
            .insert(instrument.symbol.clone(), instrument);
    }

    /// Exact-symbol lookup.
    pub fn find(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    /// All registered symbols, unordered.
    pub fn all_symbols(&self) -> Vec<&str> {
        self.instruments.keys().map(String::as_str).collect()
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }
}
