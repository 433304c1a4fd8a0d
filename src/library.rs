//! # Map Library
//!
//! A named collection of maps in the binary map format.
//!
//! The library keeps every map as validated bytes and decodes a fresh [`Map`]
//! each time one is requested, so callers can play on a map without changing
//! the stored copy. Build one at startup and pass it to whatever needs it.

use crate::{codec, DelveError, DelveResult, Map};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// File extension used for map files.
pub const MAP_FILE_EXTENSION: &str = "dm";

/// Maps available to a host, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MapLibrary {
    maps: BTreeMap<String, Vec<u8>>,
}

impl MapLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds encoded map data under `name`, replacing any map of that name.
    ///
    /// The data must decode cleanly; otherwise the library is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{serialize, Map, MapLibrary};
    ///
    /// let mut library = MapLibrary::new();
    /// library.import_bytes("arena", serialize(&Map::open(3, 3).unwrap())).unwrap();
    /// assert_eq!(library.get("arena").unwrap().width(), 3);
    /// assert!(library.import_bytes("junk", vec![1, 2, 3]).is_err());
    /// ```
    pub fn import_bytes(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> DelveResult<()> {
        let name = name.into();
        if let Err(err) = codec::deserialize(&bytes) {
            warn!("Rejected map '{}': {}", name, err);
            return Err(err);
        }
        self.maps.insert(name, bytes);
        Ok(())
    }

    /// Adds `map` under `name`.
    pub fn insert(&mut self, name: impl Into<String>, map: &Map) {
        self.maps.insert(name.into(), codec::serialize(map));
    }

    /// Imports a map file, naming it after the file stem.
    ///
    /// Returns the name the map was stored under.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> DelveResult<String> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                DelveError::InvalidState(format!("cannot name a map after {}", path.display()))
            })?
            .to_string();
        let bytes = fs::read(path)?;
        self.import_bytes(name.clone(), bytes)?;
        Ok(name)
    }

    /// Imports every `.dm` file in `dir`.
    ///
    /// Files that fail to decode are skipped with a warning. Returns the names
    /// of the imported maps in sorted order.
    pub fn import_directory(&mut self, dir: impl AsRef<Path>) -> DelveResult<Vec<String>> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(MAP_FILE_EXTENSION)
            })
            .collect();
        paths.sort();

        let mut imported = Vec::new();
        for path in paths {
            match self.import_file(&path) {
                Ok(name) => imported.push(name),
                Err(err) => warn!("Skipping {}: {}", path.display(), err),
            }
        }
        info!(
            "Imported {} maps from {}",
            imported.len(),
            dir.as_ref().display()
        );
        Ok(imported)
    }

    /// Decodes a fresh copy of the map stored under `name`.
    pub fn get(&self, name: &str) -> DelveResult<Map> {
        let bytes = self
            .maps
            .get(name)
            .ok_or_else(|| DelveError::MapNotFound(name.to_string()))?;
        codec::deserialize(bytes)
    }

    /// The stored encoding of the map under `name`.
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.maps.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    /// Map names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.maps.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
