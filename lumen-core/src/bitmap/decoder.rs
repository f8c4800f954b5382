//! Row-by-row bitmap decoding

use lumen_hal::FileStorage;

use super::header::{BmpHeader, ImageInfo, HEADER_SIZE, MAX_ROW_BYTES};
use super::DecodeError;
use crate::color::Rgb565;

/// Read and validate the header of a bitmap without decoding it
///
/// Use this to size the output buffer before calling [`decode_image`].
pub fn read_header<S: FileStorage>(storage: &mut S, path: &str) -> Result<ImageInfo, DecodeError> {
    let mut file = storage.open(path)?;
    let result = read_info(storage, &mut file);
    let closed = storage.close(file);
    let info = result?;
    closed?;
    Ok(info)
}

/// Decode a 24-bit bitmap into `out`, top row first
///
/// `out` must hold at least `width * height` pixels; only that many are
/// written. If the file cannot be opened, is not a supported bitmap, or is
/// shorter than its header claims, `out` is left untouched.
pub fn decode_image<S: FileStorage>(
    storage: &mut S,
    path: &str,
    out: &mut [Rgb565],
) -> Result<ImageInfo, DecodeError> {
    let mut file = match storage.open(path) {
        Ok(file) => file,
        Err(e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Cannot open {=str}: {}", path, e);
            return Err(e.into());
        }
    };

    let result = decode_file(storage, &mut file, out);
    let closed = storage.close(file);

    match result {
        Ok(info) => {
            #[cfg(feature = "defmt")]
            defmt::info!(
                "Decoded {=str}: {}x{} ({=bool})",
                path,
                info.width,
                info.height,
                info.top_down
            );
            closed?;
            Ok(info)
        }
        Err(e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Failed to decode {=str}: {}", path, e);
            Err(e)
        }
    }
}

fn read_info<S: FileStorage>(storage: &mut S, file: &mut S::File) -> Result<ImageInfo, DecodeError> {
    let mut bytes = [0u8; HEADER_SIZE];
    storage.read_exact(file, &mut bytes)?;
    BmpHeader::parse(&bytes)?.image_info()
}

fn decode_file<S: FileStorage>(
    storage: &mut S,
    file: &mut S::File,
    out: &mut [Rgb565],
) -> Result<ImageInfo, DecodeError> {
    let info = read_info(storage, file)?;
    if out.len() < info.pixel_count() {
        return Err(DecodeError::BufferTooSmall);
    }

    // Probe the final sample byte so a short file fails before any pixel
    // is written
    let mut probe = [0u8; 1];
    storage.seek(file, info.last_sample_offset())?;
    storage.read_exact(file, &mut probe)?;

    let row_bytes = info.row_bytes();
    let mut row = [0u8; MAX_ROW_BYTES];
    let rows = out[..info.pixel_count()].chunks_exact_mut(info.width as usize);

    for (y, out_row) in rows.enumerate() {
        storage.seek(file, info.row_offset(y as u16))?;
        storage.read_exact(file, &mut row[..row_bytes])?;

        for (pixel, sample) in out_row.iter_mut().zip(row[..row_bytes].chunks_exact(3)) {
            *pixel = Rgb565::from_bgr888([sample[0], sample[1], sample[2]]);
        }
    }

    Ok(info)
}
