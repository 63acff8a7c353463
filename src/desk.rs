use crate::model::Roster;
use crate::scheduler::{SchedError, Scheduler};
use crate::storage::Storage;
use std::sync::{Mutex, MutexGuard};

/// Guichet partagé : un scheduler protégé par un mutex, adossé à un
/// support. Chaque appel à `execute` est une unité de travail complète
/// (opération puis commit), sérialisée avec les autres.
#[derive(Debug)]
pub struct Desk<S: Storage> {
    storage: S,
    scheduler: Mutex<Scheduler>,
}

impl<S: Storage> Desk<S> {
    /// Ouvre le support (roster vide s'il n'existe pas encore).
    pub fn open(storage: S) -> anyhow::Result<Self> {
        Self::open_with(storage, Scheduler::new())
    }

    /// Reprend un scheduler déjà configuré (horloge, options) ; son roster
    /// est remplacé par celui du support quand il existe.
    pub fn open_with(storage: S, mut scheduler: Scheduler) -> anyhow::Result<Self> {
        if storage.exists() {
            scheduler.replace_roster(storage.load()?);
        }
        Ok(Self {
            storage,
            scheduler: Mutex::new(scheduler),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn lock(&self) -> Result<MutexGuard<'_, Scheduler>, SchedError> {
        self.scheduler
            .lock()
            .map_err(|_| SchedError::Other(anyhow::anyhow!("scheduler lock poisoned")))
    }

    /// Exécute `op` puis persiste si la révision a avancé, sous le verrou
    /// du support : l'état est d'abord rattrapé sur celui du support quand
    /// un autre processus l'a modifié. `op` peut enchaîner plusieurs
    /// opérations : une erreur les annule toutes. Un commit refusé recharge
    /// l'état du support et renvoie l'erreur.
    pub fn execute<T, F>(&self, op: F) -> Result<T, SchedError>
    where
        F: FnOnce(&mut Scheduler) -> Result<T, SchedError>,
    {
        let mut scheduler = self.lock()?;
        let _guard = self.storage.lock()?;
        if self.storage.exists() {
            let stored = self.storage.load()?;
            if stored.revision != scheduler.roster().revision {
                scheduler.replace_roster(stored);
            }
        }
        let before = scheduler.roster().clone();
        let base = before.revision;
        let out = match op(&mut scheduler) {
            Ok(out) => out,
            Err(err) => {
                scheduler.replace_roster(before);
                return Err(err);
            }
        };
        if scheduler.roster().revision != base {
            if let Err(err) = self.storage.commit(base, scheduler.roster()) {
                let reloaded = self.storage.load_or_default()?;
                scheduler.replace_roster(reloaded);
                return Err(err);
            }
        }
        Ok(out)
    }

    /// Lecture sous verrou, sans commit.
    pub fn read<T, F>(&self, f: F) -> Result<T, SchedError>
    where
        F: FnOnce(&Scheduler) -> T,
    {
        let scheduler = self.lock()?;
        Ok(f(&scheduler))
    }

    pub fn snapshot(&self) -> Result<Roster, SchedError> {
        self.read(|s| s.roster().clone())
    }
}
