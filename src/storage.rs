use crate::model::Roster;
use crate::scheduler::SchedError;
use anyhow::Context;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Verrou exclusif sur le support, relâché à la destruction.
#[derive(Debug, Default)]
pub struct StorageLock {
    _file: Option<File>,
}

pub trait Storage {
    /// Charge un roster depuis un support.
    fn load(&self) -> anyhow::Result<Roster>;
    /// Sauvegarde de manière atomique.
    fn save(&self, roster: &Roster) -> anyhow::Result<()>;
    /// Le support contient-il déjà un roster ?
    fn exists(&self) -> bool;

    fn load_or_default(&self) -> anyhow::Result<Roster> {
        if self.exists() {
            self.load()
        } else {
            Ok(Roster::default())
        }
    }

    fn current_revision(&self) -> anyhow::Result<u64> {
        Ok(self.load_or_default()?.revision)
    }

    /// Verrou exclusif entre processus, tenu le temps d'une unité de
    /// travail (lecture de la révision, opération, écriture). Sans objet
    /// pour un support qui ne vit que dans le processus.
    fn lock(&self) -> anyhow::Result<StorageLock> {
        Ok(StorageLock::default())
    }

    /// Écrit `roster` seulement si le support est encore à `base` (un
    /// support vide accepte toujours le premier commit). La lecture et
    /// l'écriture ne sont atomiques que sous `lock()`.
    fn commit(&self, base: u64, roster: &Roster) -> Result<(), SchedError> {
        if self.exists() {
            let found = self.current_revision()?;
            if found != base {
                return Err(SchedError::ConcurrentModification {
                    expected: base,
                    found,
                });
            }
        }
        self.save(roster)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.is_dir() {
            anyhow::bail!("{} is a directory", path.display());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fichier témoin du verrou, à côté du roster (`roster.json.lock`).
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "roster".into());
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

impl Storage for JsonStorage {
    fn load(&self) -> anyhow::Result<Roster> {
        let data = fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let roster: Roster = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(roster)
    }

    fn save(&self, roster: &Roster) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(roster)?;
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn lock(&self) -> anyhow::Result<StorageLock> {
        let path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        FileExt::lock_exclusive(&file).with_context(|| format!("locking {}", path.display()))?;
        Ok(StorageLock { _file: Some(file) })
    }
}

/// Support en mémoire pour les tests et l'embarqué.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Roster>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: Roster) -> Self {
        Self {
            slot: Mutex::new(Some(roster)),
        }
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Roster> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        slot.clone().context("memory storage is empty")
    }

    fn save(&self, roster: &Roster) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        *slot = Some(roster.clone());
        Ok(())
    }

    fn exists(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}
