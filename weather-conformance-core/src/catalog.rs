use std::{fs, path::Path};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{HarnessError, Result};
use crate::model::{CityRecord, from_json_case_insensitive};

/// The static city dataset, read once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct CityCatalog {
    cities: Vec<CityRecord>,
}

impl CityCatalog {
    /// Read and decode the whole catalog file. Nothing is returned unless every
    /// record decodes.
    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| HarnessError::DataUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let contents =
            fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let cities: Vec<CityRecord> = from_json_case_insensitive(&contents)
            .map_err(|e| unavailable(e.to_string()))?;

        tracing::debug!(path = %path.display(), cities = cities.len(), "Loaded city catalog");
        Ok(Self { cities })
    }

    pub fn from_cities(cities: Vec<CityRecord>) -> Self {
        Self { cities }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[CityRecord] {
        &self.cities
    }

    /// Uniformly pick one city using the thread-local, OS-seeded generator.
    pub fn pick_random(&self) -> Result<&CityRecord> {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&CityRecord> {
        self.cities.choose(rng).ok_or(HarnessError::EmptyCatalog)
    }
}
