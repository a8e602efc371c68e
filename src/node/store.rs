//! Local storage engine for a node
//!
//! An in-memory map with a snapshot file for restarts: `close()` writes
//! the snapshot, `open()` loads it back, `destroy()` removes the node's
//! data directory outright. The snapshot is a magic header, a crc32 of
//! the body, then the bincode-encoded map. Which of close/destroy runs at
//! shutdown depends on whether the node holds a persistent identity.

use crate::common::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "store.snap";
const SNAPSHOT_MAGIC: &[u8; 8] = b"RINGKV01";

#[derive(Debug)]
pub struct KvStore {
    dir: PathBuf,
    map: HashMap<Vec<u8>, Vec<u8>>,
}

impl KvStore {
    /// Open the store under `dir`, creating it if needed and replaying the
    /// snapshot left by a previous `close()`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let snapshot = dir.join(SNAPSHOT_FILE);
        let map = if snapshot.exists() {
            load_snapshot(&snapshot)?
        } else {
            HashMap::new()
        };

        Ok(Self { dir, map })
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.get(key).cloned()
    }

    /// Insert or overwrite. Never fails.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.map.insert(key.to_vec(), value.to_vec());
    }

    /// Overwrite an existing key; a missing key is an error.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        match self.map.get_mut(key) {
            Some(slot) => {
                *slot = value.to_vec();
                Ok(())
            }
            None => Err(Error::KeyNotFound(
                String::from_utf8_lossy(key).into_owned(),
            )),
        }
    }

    /// Remove a key; a missing key is an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        match self.map.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::KeyNotFound(
                String::from_utf8_lossy(key).into_owned(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Persist the snapshot so a later `open()` sees the same contents.
    pub fn close(&self) -> Result<()> {
        let body = bincode::serialize(&self.map)
            .map_err(|e| Error::Internal(format!("serialize snapshot: {}", e)))?;

        let file = File::create(self.dir.join(SNAPSHOT_FILE))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        writer.write_all(&body)?;
        writer.flush()?;

        Ok(())
    }

    /// Remove the node's data directory, snapshot included.
    pub fn destroy(&self) -> Result<()> {
        std::fs::remove_dir_all(&self.dir)?;
        Ok(())
    }
}

fn load_snapshot(path: &Path) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(Error::Corrupted("invalid snapshot magic".into()));
    }

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let expected = u32::from_le_bytes(crc_bytes);

    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    if crc32fast::hash(&body) != expected {
        return Err(Error::Corrupted("snapshot checksum mismatch".into()));
    }

    bincode::deserialize(&body).map_err(|e| Error::Corrupted(format!("snapshot decode: {}", e)))
}
