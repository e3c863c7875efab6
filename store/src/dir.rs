use std::{
    fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use splice_model::{Definition, DefinitionRecord};
use tempfile::NamedTempFile;

use crate::{Error, ModelStore};

/// Filesystem store: one pretty-printed JSON record per identity at `<root>/<identity>.json`.
///
/// Writes go to the output root only. Lookups consult the output root followed by every search
/// root and return one definition per root that holds the identity.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
    search: Vec<PathBuf>,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search: Vec::new(),
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path != self.root && !self.search.contains(&path) {
            self.search.push(path);
        }
        self
    }

    fn roots(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.root).chain(&self.search)
    }
}

fn record_path(root: &Path, identity: &str) -> Result<PathBuf, Error> {
    let invalid = identity.is_empty()
        || identity == "."
        || identity.contains("..")
        || identity.contains(['/', '\\'])
        || identity.contains('\0');
    if invalid {
        return Err(Error::InvalidIdentity(identity.to_string()));
    }
    Ok(root.join(format!("{identity}.json")))
}

fn read_record(path: &Path) -> Result<Option<DefinitionRecord>, Error> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let record = serde_json::from_slice(&contents).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(record))
}

impl ModelStore for DirStore {
    fn lookup(&self, identity: &str) -> Result<Vec<Definition>, Error> {
        let mut found = Vec::new();
        for root in self.roots() {
            let path = record_path(root, identity)?;
            let Some(record) = read_record(&path)? else {
                continue;
            };
            tracing::trace!(identity, path = %path.display(), "loaded stored definition");
            found.push(Definition::from_record(record, path.display().to_string())?);
        }
        Ok(found)
    }

    fn store(&self, definition: &Definition) -> Result<(), Error> {
        let path = record_path(&self.root, definition.identity())?;
        let io_err = |source| Error::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_err)?;
        let mut file = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        let json = serde_json::to_vec_pretty(&definition.to_record()).map_err(|source| {
            Error::Json {
                path: path.clone(),
                source,
            }
        })?;
        file.write_all(&json).map_err(io_err)?;
        file.persist(&path).map_err(|err| io_err(err.error))?;

        tracing::debug!(identity = definition.identity(), path = %path.display(), "stored definition");
        Ok(())
    }
}
