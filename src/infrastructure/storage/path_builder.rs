use std::path::{Component, Path, PathBuf};

use crate::application::ports::StorageError;

pub const TEMP_DIR: &str = ".incoming";

/// Paths below the upload root
#[derive(Debug, Clone)]
pub struct PathBuilder {
    root: PathBuf,
}

impl PathBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging path for a file being copied in: /root/.incoming/{uuid}
    pub fn temp_path(&self, id: uuid::Uuid) -> PathBuf {
        self.root.join(TEMP_DIR).join(id.to_string())
    }

    /// Final location for `directory/filename`.
    ///
    /// `directory` must be relative and free of `..`; `filename` must be a
    /// single plain component.
    pub fn final_path(&self, directory: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        let outside = || StorageError::OutsideRoot(directory.join(filename));

        if !directory
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(outside());
        }
        let mut name = Path::new(filename).components();
        match (name.next(), name.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(outside()),
        }
        if directory
            .components()
            .next()
            .is_some_and(|c| c.as_os_str() == TEMP_DIR)
        {
            return Err(outside());
        }

        Ok(self.root.join(directory).join(filename))
    }

    /// Resolve a caller-supplied path: relative paths are taken from the root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_path() {
        let paths = PathBuilder::new(PathBuf::from("/srv/uploads"));
        assert_eq!(
            paths.final_path(Path::new("models/2024"), "a.stl").unwrap(),
            PathBuf::from("/srv/uploads/models/2024/a.stl")
        );
        assert_eq!(
            paths.final_path(Path::new(""), "a.stl").unwrap(),
            PathBuf::from("/srv/uploads/a.stl")
        );
    }

    #[test]
    fn test_escapes_refused() {
        let paths = PathBuilder::new(PathBuf::from("/srv/uploads"));
        for (dir, name) in [
            ("../etc", "a.txt"),
            ("/etc", "a.txt"),
            ("docs", "../a.txt"),
            ("docs", "sub/a.txt"),
            ("docs", ""),
            (".incoming", "a.txt"),
        ] {
            assert!(
                matches!(
                    paths.final_path(Path::new(dir), name),
                    Err(StorageError::OutsideRoot(_))
                ),
                "{}/{}",
                dir,
                name
            );
        }
    }
}
