//! Multi-entry archive layout
//!
//! A file whose reference table entry lists more than one child packs all of
//! them into one payload. The payload ends with a chunk count byte, preceded
//! by a table of `chunks * entries` big-endian deltas. Within each chunk the
//! running sum of deltas gives the number of bytes each entry contributes.
//! The data area is chunk-major: all entries of chunk 0, then chunk 1, and so
//! on.

use crate::buffer::{ByteReader, ByteWriter};
use crate::error::{FormatError, Result};
use bytes::Bytes;

/// Split an archive payload into `entry_count` entries.
///
/// A single-entry file is returned whole without inspecting its bytes.
pub fn split_entries(data: &[u8], entry_count: usize) -> Result<Vec<Bytes>> {
    if entry_count <= 1 {
        return Ok(vec![Bytes::copy_from_slice(data)]);
    }

    let Some(&chunk_count) = data.last() else {
        return Err(FormatError::Truncated {
            position: 0,
            needed: 1,
            available: 0,
        });
    };
    let chunk_count = chunk_count as usize;

    let table_len = chunk_count * entry_count * 4;
    let table_start = (data.len() - 1)
        .checked_sub(table_len)
        .ok_or(FormatError::Truncated {
            position: 0,
            needed: table_len + 1,
            available: data.len(),
        })?;

    let mut table = ByteReader::new(&data[table_start..data.len() - 1]);
    let mut chunk_sizes = vec![vec![0usize; entry_count]; chunk_count];
    let mut entry_sizes = vec![0usize; entry_count];

    for sizes in &mut chunk_sizes {
        let mut size: i32 = 0;
        for (entry, slot) in sizes.iter_mut().enumerate() {
            size = size.wrapping_add(table.read_i32()?);
            let len = usize::try_from(size).map_err(|_| FormatError::InvalidEntrySize(size))?;
            *slot = len;
            entry_sizes[entry] += len;
        }
    }

    let mut entries: Vec<Vec<u8>> = entry_sizes
        .iter()
        .map(|&n| Vec::with_capacity(n.min(table_start)))
        .collect();
    let mut body = ByteReader::new(&data[..table_start]);
    for sizes in &chunk_sizes {
        for (entry, &len) in sizes.iter().enumerate() {
            entries[entry].extend_from_slice(body.take(len)?);
        }
    }

    Ok(entries.into_iter().map(Bytes::from).collect())
}

/// Pack entries into a single-chunk archive payload.
///
/// The inverse of [`split_entries`] for one chunk; a single entry is returned
/// as is.
pub fn join_entries(entries: &[Bytes]) -> Vec<u8> {
    if entries.len() == 1 {
        return entries[0].to_vec();
    }

    let mut writer = ByteWriter::new();
    for entry in entries {
        writer.write_bytes(entry);
    }

    let mut previous = 0i32;
    for entry in entries {
        let len = entry.len() as i32;
        writer.write_i32(len - previous);
        previous = len;
    }
    writer.write_u8(1);
    writer.into_inner()
}
