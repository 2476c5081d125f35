use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;

/// Local storage for remote desktop profiles, one per session id.
pub trait ProfileStore {
    fn write(&self, session_id: &str, contents: &str) -> Result<PathBuf>;
    fn clear(&self, session_id: &str) -> Result<()>;
}

pub struct FsProfileStore {
    dir: PathBuf,
}

impl FsProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("vcl_{}.remmina", safe))
    }
}

impl ProfileStore for FsProfileStore {
    fn write(&self, session_id: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(session_id);
        fs::write(&path, contents)?;
        debug!(path = %path.display(), "wrote remote desktop profile");
        Ok(path)
    }

    fn clear(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed previous profile");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
