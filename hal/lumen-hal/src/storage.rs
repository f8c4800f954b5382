//! File storage abstractions
//!
//! Provides a read-only file interface that chip-specific code implements
//! over its mounted card or filesystem. Paths are `/`-separated and
//! resolved from the volume root.

/// Errors from file storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No file or directory with that name
    NotFound,
    /// Path is empty or a component is not a valid name
    InvalidPath,
    /// Underlying device or filesystem error
    Io,
    /// No handle available to open another file or directory
    TooManyOpenFiles,
    /// File ended before the requested bytes were read
    UnexpectedEof,
}

/// Read-only file storage trait
///
/// Implementations should handle:
/// - Resolving nested paths from the volume root
/// - Releasing every handle passed to [`FileStorage::close`]
pub trait FileStorage {
    /// Handle to an open file
    type File;

    /// Open a file for reading
    fn open(&mut self, path: &str) -> Result<Self::File, StorageError>;

    /// Move the read position to `offset` bytes from the start of the file
    fn seek(&mut self, file: &mut Self::File, offset: u32) -> Result<(), StorageError>;

    /// Read up to `buf.len()` bytes, returning how many were read
    ///
    /// A return of 0 means end of file.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Close a file, releasing its handle
    fn close(&mut self, file: Self::File) -> Result<(), StorageError>;

    /// Fill `buf` completely, looping over short reads
    fn read_exact(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<(), StorageError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(file, &mut buf[filled..])? {
                0 => return Err(StorageError::UnexpectedEof),
                n => filled += n,
            }
        }
        Ok(())
    }
}

/// Split a path into its non-empty components
///
/// Leading, trailing and repeated separators are ignored, so `/logo.bmp`
/// and `logo.bmp` name the same file.
pub fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|component| !component.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Serves a byte slice, at most `chunk` bytes per read
    struct SliceStorage {
        data: Vec<u8>,
        chunk: usize,
    }

    impl FileStorage for SliceStorage {
        type File = usize;

        fn open(&mut self, path: &str) -> Result<usize, StorageError> {
            match path {
                "/data.bin" => Ok(0),
                _ => Err(StorageError::NotFound),
            }
        }

        fn seek(&mut self, file: &mut usize, offset: u32) -> Result<(), StorageError> {
            *file = offset as usize;
            Ok(())
        }

        fn read(&mut self, file: &mut usize, buf: &mut [u8]) -> Result<usize, StorageError> {
            let remaining = self.data.len().saturating_sub(*file);
            let n = buf.len().min(remaining).min(self.chunk);
            buf[..n].copy_from_slice(&self.data[*file..*file + n]);
            *file += n;
            Ok(n)
        }

        fn close(&mut self, _file: usize) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_read_exact_loops_short_reads() {
        let mut storage = SliceStorage {
            data: (0..20).collect(),
            chunk: 3,
        };
        let mut file = storage.open("/data.bin").unwrap();
        storage.seek(&mut file, 4).unwrap();

        let mut buf = [0u8; 10];
        storage.read_exact(&mut file, &mut buf).unwrap();
        assert_eq!(buf, [4, 5, 6, 7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn test_read_exact_past_end() {
        let mut storage = SliceStorage {
            data: vec![1, 2, 3],
            chunk: 8,
        };
        let mut file = storage.open("/data.bin").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(
            storage.read_exact(&mut file, &mut buf),
            Err(StorageError::UnexpectedEof)
        );
    }

    #[test]
    fn test_path_components() {
        let parts: Vec<&str> = path_components("/images//sprites/ghost.bmp").collect();
        assert_eq!(parts, ["images", "sprites", "ghost.bmp"]);
        assert_eq!(path_components("logo.bmp").count(), 1);
        assert_eq!(path_components("/").count(), 0);
    }
}
