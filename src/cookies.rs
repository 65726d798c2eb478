use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;

use crate::error::{Error, Result};

/// Reads the persisted jar. A missing file yields an empty store; a corrupt
/// one is deleted and also yields an empty store.
pub fn load(path: &Path) -> CookieStore {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(target: "cookies", "no cookie file at {}", path.display());
            return CookieStore::default();
        }
        Err(e) => {
            tracing::warn!(target: "cookies", "cannot open {}: {e}", path.display());
            return CookieStore::default();
        }
    };

    match cookie_store::serde::json::load_all(BufReader::new(file)) {
        Ok(store) => {
            let count = store.iter_unexpired().count();
            tracing::info!(target: "cookies", "loaded {count} cookies from {}", path.display());
            store
        }
        Err(e) => {
            let shown = path.display();
            tracing::warn!(target: "cookies", "\x1b[33mcorrupt cookie file\x1b[0m {shown}: {e}");
            remove(path);
            CookieStore::default()
        }
    }
}

/// Overwrites `path` with the current jar, session cookies included.
pub fn save(jar: &CookieStoreMutex, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let store = jar.lock().map_err(|e| Error::Cookie(e.to_string()))?;
    let mut writer = BufWriter::new(File::create(path)?);
    cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut writer)
        .map_err(|e| Error::Cookie(e.to_string()))?;
    writer.flush()?;

    let count = store.iter_unexpired().count();
    tracing::info!(target: "cookies", "\x1b[36msaved {count} cookies\x1b[0m to {}", path.display());
    Ok(())
}

pub fn remove(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(target: "cookies", "cannot delete {}: {e}", path.display());
        }
    }
}

/// Whether the jar holds anything that could authenticate a request.
pub fn is_empty(jar: &CookieStoreMutex) -> bool {
    jar.lock()
        .map_or(true, |store| store.iter_unexpired().next().is_none())
}
