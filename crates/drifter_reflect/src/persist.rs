//! Record persistence
//!
//! Encoded records are written atomically: the bytes go to a uniquely named
//! hidden temp file next to the destination, are flushed to disk, and the
//! temp file is renamed over the destination. A crash mid-write leaves the
//! previous file intact, and concurrent saves to one path never share a temp
//! file; the last rename wins. Nothing here retries; retry policy belongs to
//! the caller.

use crate::codec::{Codec, EncodedRecord};
use crate::error::{ReflectError, Result};
use crate::handle::InstanceHandle;
use crate::instance::InstanceStore;
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Configuration for record persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Create missing parent directories on save
    pub create_dirs: bool,
    /// Flush file contents to disk before the rename, and the directory
    /// entry after it
    pub sync: bool,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            create_dirs: true,
            sync: true,
        }
    }
}

/// Saves instances as records and reads records back
#[derive(Debug, Clone)]
pub struct Persistence<'r> {
    codec: Codec<'r>,
    config: PersistConfig,
}

impl<'r> Persistence<'r> {
    /// Create with the default configuration
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self::with_config(registry, PersistConfig::default())
    }

    /// Create with an explicit configuration
    pub fn with_config(registry: &'r TypeRegistry, config: PersistConfig) -> Self {
        Self {
            codec: Codec::new(registry),
            config,
        }
    }

    /// The codec used for encoding
    pub fn codec(&self) -> Codec<'r> {
        self.codec
    }

    /// Active configuration
    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    /// Encode an instance and replace `path` with the record
    pub fn save<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &S,
        handle: InstanceHandle,
        path: impl AsRef<Path>,
    ) -> Result<EncodedRecord> {
        let record = self.codec.encode(type_name, store, handle)?;
        write_atomic(path.as_ref(), record.as_bytes(), &self.config)?;
        log::debug!(
            "Saved '{}' record ({} bytes) to {}",
            type_name,
            record.len(),
            path.as_ref().display()
        );
        Ok(record)
    }

    /// Read a record for a registered type from `path`
    pub fn load(&self, type_name: &str, path: impl AsRef<Path>) -> Result<EncodedRecord> {
        let path = path.as_ref();
        self.codec.accessor().registry().get_type(type_name)?;

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ReflectError::path_not_found(path))
            }
            Err(e) => return Err(ReflectError::Io(e)),
        };

        EncodedRecord::from_text(text)
            .map_err(|msg| ReflectError::Io(io::Error::new(io::ErrorKind::InvalidData, msg)))
    }

    /// Read a record from `path` and write it into an instance.
    ///
    /// Returns the record keys the type does not declare.
    pub fn load_into<S: InstanceStore + ?Sized>(
        &self,
        type_name: &str,
        store: &mut S,
        handle: InstanceHandle,
        path: impl AsRef<Path>,
    ) -> Result<Vec<String>> {
        let record = self.load(type_name, path)?;
        self.codec.apply(type_name, store, handle, record.as_str())
    }
}

/// Replace `path` with `bytes` atomically
pub fn write_atomic(path: &Path, bytes: &[u8], config: &PersistConfig) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} does not name a file", path.display()),
            )
        })?
        .to_string_lossy()
        .into_owned();

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if config.create_dirs {
        fs::create_dir_all(&dir)?;
    }

    let temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    let temp = write_file(temp, bytes, config.sync)?;
    temp.persist(path).map_err(|e| e.error)?;

    if config.sync {
        sync_dir(&dir)?;
    }
    Ok(())
}

/// Fill a temp file; it is removed on drop if anything fails
fn write_file(temp: NamedTempFile, bytes: &[u8], sync: bool) -> io::Result<NamedTempFile> {
    let mut writer = BufWriter::new(temp);
    writer.write_all(bytes)?;
    let temp = writer.into_inner().map_err(|e| e.into_error())?;
    if sync {
        temp.as_file().sync_all()?;
    }
    Ok(temp)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::ObjectTable;
    use crate::property::PropertyType;
    use crate::registry::TypeBuilder;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        TypeBuilder::new("Transform", 12)
            .field("position", PropertyType::Vector2, 0)
            .field("rotation", PropertyType::Float, 8)
            .register(&mut registry)
            .unwrap();
        registry
    }

    #[test]
    fn test_save_then_load_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let persistence = Persistence::new(&registry);
        let mut table = ObjectTable::new();
        let h = table.create_named(&registry, "Transform").unwrap();
        persistence
            .codec()
            .accessor()
            .set("Transform", "rotation", &mut table, h, 12.5f32)
            .unwrap();

        let path = dir.path().join("nested/deeper/transform.json");
        let saved = persistence.save("Transform", &table, h, &path).unwrap();
        let loaded = persistence.load("Transform", &path).unwrap();

        assert_eq!(saved, loaded);
        assert_eq!(fs::read(&path).unwrap(), saved.as_bytes());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        fs::write(&path, b"old contents that are longer than the record").unwrap();

        let registry = registry();
        let persistence = Persistence::new(&registry);
        let mut table = ObjectTable::new();
        let h = table.create_named(&registry, "Transform").unwrap();
        let saved = persistence.save("Transform", &table, h, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), saved.as_str());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_encode_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        fs::write(&path, b"{\"previous\":true}").unwrap();

        let registry = registry();
        let persistence = Persistence::new(&registry);
        let mut table = ObjectTable::new();
        let h = table.create_named(&registry, "Transform").unwrap();
        persistence
            .codec()
            .accessor()
            .set("Transform", "rotation", &mut table, h, f32::INFINITY)
            .unwrap();

        assert!(persistence.save("Transform", &table, h, &path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"previous\":true}");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let persistence = Persistence::new(&registry);

        assert!(matches!(
            persistence.load("Transform", dir.path().join("missing.json")),
            Err(ReflectError::NotFound(_))
        ));
        assert!(matches!(
            persistence.load("Ghost", dir.path().join("missing.json")),
            Err(ReflectError::UnknownType(_))
        ));

        // a directory cannot be read as a record
        assert!(matches!(
            persistence.load("Transform", dir.path()),
            Err(ReflectError::Io(_))
        ));

        let binary = dir.path().join("binary.json");
        fs::write(&binary, [0xFFu8, 0xFE, 0x00]).unwrap();
        assert!(matches!(
            persistence.load("Transform", &binary),
            Err(ReflectError::Io(_))
        ));
    }

    #[test]
    fn test_save_without_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let persistence = Persistence::with_config(
            &registry,
            PersistConfig {
                create_dirs: false,
                sync: false,
            },
        );
        let mut table = ObjectTable::new();
        let h = table.create_named(&registry, "Transform").unwrap();

        let result = persistence.save("Transform", &table, h, dir.path().join("absent/record.json"));
        assert!(matches!(result, Err(ReflectError::Io(_))));
    }

    #[test]
    fn test_concurrent_saves_to_one_path() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("shared.json"));
        let registry = Arc::new(registry());

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let persistence = Persistence::new(&registry);
                    let mut table = ObjectTable::new();
                    let h = table.create_named(&registry, "Transform").unwrap();
                    persistence
                        .codec()
                        .accessor()
                        .set("Transform", "rotation", &mut table, h, i as f32)
                        .unwrap();
                    (0..20)
                        .map(|_| persistence.save("Transform", &table, h, path.as_path()))
                        .filter(|r| r.is_err())
                        .count()
                })
            })
            .collect();

        let failures: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let persistence = Persistence::new(&registry);
        let record = persistence.load("Transform", path.as_path()).unwrap();
        assert!(persistence.codec().decode("Transform", record.as_str()).is_ok());

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_load_into_restores_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, r#"{"position":[5.0,6.0],"rotation":30.0}"#).unwrap();

        let registry = registry();
        let persistence = Persistence::new(&registry);
        let mut table = ObjectTable::new();
        let h = table.create_named(&registry, "Transform").unwrap();

        let unknown = persistence.load_into("Transform", &mut table, h, &path).unwrap();
        assert!(unknown.is_empty());
        assert_eq!(
            persistence
                .codec()
                .accessor()
                .get::<[f32; 2], _>("Transform", "position", &table, h)
                .unwrap(),
            [5.0, 6.0]
        );
    }
}
