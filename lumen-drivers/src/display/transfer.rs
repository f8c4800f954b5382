//! Blit planning
//!
//! Turns a rectangle and a pixel source into the ordered list of transfer
//! units for one blit: the address window (CASET + range, RASET + range),
//! RAMWR, then the pixel payload split into chunks no larger than the
//! transport's maximum transfer size.

use heapless::Vec;
use lumen_core::geometry::{Area, BYTES_PER_PIXEL, HEIGHT, SCREEN_PIXELS, WIDTH};
use lumen_hal::{Transaction, MAX_TRANSFER_SIZE};

use super::command::cmd;
use super::DisplayError;

/// Capacity of the per-blit unit list
pub const MAX_UNITS: usize = 12;

/// Units preceding the payload: CASET, range, RASET, range, RAMWR
pub const HEADER_UNITS: usize = 5;

/// Payload chunks needed for `total_bytes` at `max_transfer` bytes per chunk
pub const fn chunk_count(total_bytes: usize, max_transfer: usize) -> usize {
    total_bytes.div_ceil(max_transfer)
}

// A full-screen blit must fit the unit list
const _: () = assert!(
    HEADER_UNITS + chunk_count(SCREEN_PIXELS * BYTES_PER_PIXEL, MAX_TRANSFER_SIZE) <= MAX_UNITS
);

/// Where payload chunks take their bytes from
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Each chunk continues where the previous one ended
    Pixels(&'a [u8]),
    /// Every chunk sends the start of the same pre-filled buffer
    Constant(&'a [u8]),
}

/// Inclusive end column and end row for the address window
///
/// Clamped to the surface width and height themselves, one past the last
/// addressable column and row.
pub fn window_end(area: &Area) -> (u16, u16) {
    let end_col = (u32::from(area.x) + u32::from(area.width) - 1).min(u32::from(WIDTH));
    let end_row = (u32::from(area.y) + u32::from(area.height) - 1).min(u32::from(HEIGHT));
    (end_col as u16, end_row as u16)
}

fn range_bytes(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// Build the transfer units for one blit
pub fn plan<'a>(
    area: &Area,
    source: Source<'a>,
    max_transfer: usize,
) -> Result<Vec<Transaction<'a>, MAX_UNITS>, DisplayError> {
    if area.is_empty() || !area.origin_on_screen() {
        return Err(DisplayError::InvalidCoordinates);
    }

    let total = area.byte_len().ok_or(DisplayError::BufferOverflow)?;
    let (available, needed) = match source {
        Source::Pixels(bytes) => (bytes.len(), total),
        Source::Constant(bytes) => (bytes.len(), total.min(max_transfer)),
    };
    if available < needed {
        return Err(DisplayError::BufferTooSmall);
    }
    if HEADER_UNITS + chunk_count(total, max_transfer) > MAX_UNITS {
        return Err(DisplayError::BufferOverflow);
    }

    let (end_col, end_row) = window_end(area);
    let header = [
        Transaction::command(cmd::CASET),
        Transaction::data_inline(range_bytes(area.x, end_col)),
        Transaction::command(cmd::RASET),
        Transaction::data_inline(range_bytes(area.y, end_row)),
        Transaction::command(cmd::RAMWR),
    ];

    let mut units = Vec::new();
    for unit in header {
        units.push(unit).map_err(|_| DisplayError::BufferOverflow)?;
    }

    let mut sent = 0;
    while sent < total {
        let len = (total - sent).min(max_transfer);
        let bytes = match source {
            Source::Pixels(bytes) => &bytes[sent..sent + len],
            Source::Constant(bytes) => &bytes[..len],
        };
        units
            .push(Transaction::data(bytes))
            .map_err(|_| DisplayError::BufferOverflow)?;
        sent += len;
    }

    Ok(units)
}
