use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::config_directory;
use crate::error::{AppError, AppResult};
use crate::services::SessionStore;

const SESSION_FILE_NAME: &str = "session.json";

#[derive(Default, Serialize, Deserialize)]
struct SessionFile {
    entries: BTreeMap<String, String>,
}

/// Session kept on disk so it survives between invocations.
pub struct FileSessionStore {
    file_path: PathBuf,
    file: Mutex<SessionFile>,
}

impl FileSessionStore {
    pub fn load() -> AppResult<Self> {
        let dir = config_directory()?;
        Self::open(dir.join(SESSION_FILE_NAME))
    }

    pub fn open(path: PathBuf) -> AppResult<Self> {
        let file = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<SessionFile>(&contents)
                .map_err(|err| AppError::Session(format!("invalid session file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SessionFile::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self {
            file_path: path,
            file: Mutex::new(file),
        })
    }

    fn save(&self, file: &SessionFile) -> AppResult<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(file)
            .map_err(|err| AppError::Session(format!("failed to write session: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.file.lock().entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut file = self.file.lock();
        file.entries.insert(key.to_string(), value.to_string());
        self.save(&file)
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut file = self.file.lock();
        if file.entries.remove(key).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }

    fn clear_all(&self) -> AppResult<()> {
        let mut file = self.file.lock();
        file.entries.clear();
        self.save(&file)
    }
}

/// Process-local session, used when nothing should touch the disk.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        store.entries.lock().extend(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear_all(&self) -> AppResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}
