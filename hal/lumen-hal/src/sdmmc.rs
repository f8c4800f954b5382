//! `FileStorage` over an SD card FAT volume
//!
//! Uses the raw-handle API of `embedded-sdmmc` so the volume and root
//! directory stay open for the lifetime of the adapter, and every file
//! opened through [`FileStorage::open`] is an independent handle.

use embedded_sdmmc::{
    BlockDevice, Error, Mode, RawDirectory, RawFile, RawVolume, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};

use crate::storage::{path_components, FileStorage, StorageError};

/// Read-only file access to the first FAT volume of a card
pub struct SdmmcStorage<
    D,
    T,
    const MAX_DIRS: usize = 4,
    const MAX_FILES: usize = 4,
    const MAX_VOLUMES: usize = 1,
> where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES>,
    volume: RawVolume,
    root: RawDirectory,
}

impl<D, T, const MAX_DIRS: usize, const MAX_FILES: usize, const MAX_VOLUMES: usize>
    SdmmcStorage<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// Open volume 0 and its root directory
    pub fn mount(
        volume_mgr: VolumeManager<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES>,
    ) -> Result<Self, StorageError> {
        let volume = volume_mgr.open_raw_volume(VolumeIdx(0)).map_err(map_error)?;
        let root = match volume_mgr.open_root_dir(volume) {
            Ok(root) => root,
            Err(e) => {
                let _ = volume_mgr.close_volume(volume);
                return Err(map_error(e));
            }
        };

        #[cfg(feature = "defmt")]
        defmt::info!("SD volume mounted");

        Ok(Self {
            volume_mgr,
            volume,
            root,
        })
    }

    /// Close the root directory and volume, returning the volume manager
    pub fn unmount(self) -> VolumeManager<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES> {
        let _ = self.volume_mgr.close_dir(self.root);
        let _ = self.volume_mgr.close_volume(self.volume);
        self.volume_mgr
    }
}

impl<D, T, const MAX_DIRS: usize, const MAX_FILES: usize, const MAX_VOLUMES: usize> FileStorage
    for SdmmcStorage<D, T, MAX_DIRS, MAX_FILES, MAX_VOLUMES>
where
    D: BlockDevice,
    T: TimeSource,
{
    type File = RawFile;

    fn open(&mut self, path: &str) -> Result<RawFile, StorageError> {
        let mut components = path_components(path);
        let mut name = components.next().ok_or(StorageError::InvalidPath)?;

        // Directory handle opened while walking, never the root
        let mut walked: Option<RawDirectory> = None;

        for next in components {
            let parent = walked.unwrap_or(self.root);
            let child = self.volume_mgr.open_dir(parent, name);
            if let Some(dir) = walked.take() {
                let _ = self.volume_mgr.close_dir(dir);
            }
            walked = Some(child.map_err(map_error)?);
            name = next;
        }

        let dir = walked.unwrap_or(self.root);
        let file = self.volume_mgr.open_file_in_dir(dir, name, Mode::ReadOnly);
        if let Some(dir) = walked {
            let _ = self.volume_mgr.close_dir(dir);
        }
        file.map_err(map_error)
    }

    fn seek(&mut self, file: &mut RawFile, offset: u32) -> Result<(), StorageError> {
        self.volume_mgr
            .file_seek_from_start(*file, offset)
            .map_err(map_error)
    }

    fn read(&mut self, file: &mut RawFile, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.volume_mgr.read(*file, buf).map_err(map_error)
    }

    fn close(&mut self, file: RawFile) -> Result<(), StorageError> {
        self.volume_mgr.close_file(file).map_err(map_error)
    }
}

fn map_error<E: core::fmt::Debug>(error: Error<E>) -> StorageError {
    match error {
        Error::NotFound => StorageError::NotFound,
        Error::FilenameError(_) | Error::OpenedDirAsFile | Error::OpenedFileAsDir => {
            StorageError::InvalidPath
        }
        Error::TooManyOpenFiles | Error::TooManyOpenDirs => StorageError::TooManyOpenFiles,
        Error::EndOfFile | Error::InvalidOffset => StorageError::UnexpectedEof,
        _ => StorageError::Io,
    }
}

/// Time source returning one fixed timestamp
///
/// Files are only ever read, so no timestamp is written back to the card.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 54,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}
