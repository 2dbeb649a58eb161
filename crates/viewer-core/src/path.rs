//! Mesh reference path utilities

/// File name and extension extracted from a mesh reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Bare file name, no directory components.
    pub file_name: String,
    /// Extension after the first `.` of the file name, lowercased.
    pub file_extension: String,
}

impl FileInfo {
    /// Extract the file name and extension from a mesh reference path.
    ///
    /// The file name is the substring after the last `/`; the extension is
    /// the substring after the first `.` in that name. Uploaded-file lookup
    /// is keyed by the file name exactly as it appears in the reference,
    /// while the extension is lowercased for format dispatch.
    pub fn from_path(path: &str) -> Result<Self, PathError> {
        let file_name = match path.rfind('/') {
            Some(idx) => &path[idx + 1..],
            None => path,
        };

        let Some((_, extension)) = file_name.split_once('.') else {
            return Err(PathError::MissingExtension(path.to_string()));
        };
        if extension.is_empty() {
            return Err(PathError::MissingExtension(path.to_string()));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            file_extension: extension.to_ascii_lowercase(),
        })
    }
}

/// Mesh reference parse errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathError {
    #[error("mesh reference '{0}' has no file extension")]
    MissingExtension(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_name_and_extension() {
        let info = FileInfo::from_path("a/b/c.stl").unwrap();
        assert_eq!(info.file_name, "c.stl");
        assert_eq!(info.file_extension, "stl");
    }

    #[test]
    fn test_extension_is_lowercased() {
        let info = FileInfo::from_path("c.STL").unwrap();
        assert_eq!(info.file_name, "c.STL");
        assert_eq!(info.file_extension, "stl");
    }

    #[test]
    fn test_bare_file_name() {
        let info = FileInfo::from_path("base_link.dae").unwrap();
        assert_eq!(info.file_name, "base_link.dae");
        assert_eq!(info.file_extension, "dae");
    }

    #[test]
    fn test_missing_extension_is_an_error() {
        assert!(matches!(
            FileInfo::from_path("meshes/base_link"),
            Err(PathError::MissingExtension(_))
        ));
        assert!(matches!(
            FileInfo::from_path("meshes/base_link."),
            Err(PathError::MissingExtension(_))
        ));
    }
}
