//! GPT partition-table decoding
//!
//! Pure functions from a raw sector buffer to an ordered sequence of
//! partition records; no I/O happens here. The decoder is deliberately
//! simplified: it reads only the fields the tool displays, and it follows
//! the end-of-table convention of the source device class (first all-zero
//! entry terminates the table regardless of the declared entry count).

/// Sector size of this device class
pub const SECTOR_SIZE: usize = 512;

/// Number of sectors a partition-table read must cover: protective MBR,
/// GPT header, and 32 sectors of entries
pub const TABLE_SECTORS: usize = 34;

/// "EFI PART" stored little-endian
const GPT_SIGNATURE: u64 = 0x5452_4150_2049_4645;

/// Byte offset of the entry count within the header
const HEADER_ENTRY_COUNT_OFFSET: usize = 80;
/// Byte offset of the per-entry size within the header
const HEADER_ENTRY_SIZE_OFFSET: usize = 84;

/// Byte offset of the starting LBA within an entry
const ENTRY_LBA_OFFSET: usize = 32;
/// Byte offset of the name field within an entry
const ENTRY_NAME_OFFSET: usize = 56;
/// Maximum number of name characters reproduced
const NAME_MAX_CHARS: usize = 35;
/// Smallest entry size that covers the fields decoded here
const ENTRY_MIN_SIZE: usize = 128;

/// One decoded partition entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    /// 0-based position in the table, prior to sentinel truncation
    pub index: usize,
    /// Starting LBA, truncated from the on-disk 64-bit value.
    ///
    /// The truncation is a lossy display convention inherited from the
    /// source tool and wraps for partitions starting beyond 2 TiB; it is
    /// kept rather than silently widened.
    pub start_lba: u32,
    /// Partition name, low byte of each 16-bit code unit
    pub name: String,
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

/// Decode the name field: 16-bit little-endian code units, copying the low
/// byte of each unit until a zero unit or the character limit. Non-ASCII
/// code points are not reproduced faithfully.
fn decode_name(field: &[u8]) -> String {
    let mut name = String::new();
    for unit in field.chunks_exact(2).take(NAME_MAX_CHARS) {
        let code_unit = u16::from_le_bytes([unit[0], unit[1]]);
        if code_unit == 0 {
            break;
        }
        name.push(char::from((code_unit & 0xFF) as u8));
    }
    name
}

/// Decode a raw table read into an ordered sequence of partition records
///
/// `buf` must cover at least the first [`TABLE_SECTORS`] sectors starting at
/// LBA 0. Returns `None` when the buffer does not carry a GPT: short input,
/// bad header signature, or an entry size too small to decode. Callers treat
/// `None` as "no partitions", not as an error.
pub fn decode_partition_table(buf: &[u8]) -> Option<Vec<PartitionRecord>> {
    if buf.len() < TABLE_SECTORS * SECTOR_SIZE {
        return None;
    }

    let header = &buf[SECTOR_SIZE..2 * SECTOR_SIZE];
    if read_u64(header, 0) != GPT_SIGNATURE {
        return None;
    }

    let entry_count = read_u32(header, HEADER_ENTRY_COUNT_OFFSET) as usize;
    let entry_size = read_u32(header, HEADER_ENTRY_SIZE_OFFSET) as usize;
    if entry_size < ENTRY_MIN_SIZE {
        return None;
    }

    let entries = &buf[2 * SECTOR_SIZE..];
    let mut records = Vec::new();

    for index in 0..entry_count {
        let offset = index * entry_size;
        if offset + entry_size > entries.len() {
            break;
        }
        let entry = &entries[offset..offset + entry_size];

        // First all-zero entry is the end-of-table sentinel; anything after
        // it does not exist semantically, even if the declared count is
        // larger.
        if entry.iter().all(|&b| b == 0) {
            break;
        }

        let start_lba = read_u64(entry, ENTRY_LBA_OFFSET) as u32;
        records.push(PartitionRecord {
            index,
            start_lba,
            name: decode_name(&entry[ENTRY_NAME_OFFSET..]),
        });
    }

    Some(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY_SIZE: usize = 128;

    /// Build a table buffer with a valid header and the given entries
    fn table_with_entries(entries: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = vec![0u8; TABLE_SECTORS * SECTOR_SIZE];
        let header = &mut buf[SECTOR_SIZE..2 * SECTOR_SIZE];
        header[0..8].copy_from_slice(b"EFI PART");
        header[HEADER_ENTRY_COUNT_OFFSET..HEADER_ENTRY_COUNT_OFFSET + 4]
            .copy_from_slice(&128u32.to_le_bytes());
        header[HEADER_ENTRY_SIZE_OFFSET..HEADER_ENTRY_SIZE_OFFSET + 4]
            .copy_from_slice(&(ENTRY_SIZE as u32).to_le_bytes());

        for (i, entry) in entries.iter().enumerate() {
            let offset = 2 * SECTOR_SIZE + i * ENTRY_SIZE;
            buf[offset..offset + entry.len()].copy_from_slice(entry);
        }
        buf
    }

    /// Build one entry with a type GUID, starting LBA and ASCII name
    fn entry(start_lba: u64, name: &str) -> Vec<u8> {
        let mut e = vec![0u8; ENTRY_SIZE];
        e[0] = 0xAD; // any non-zero type GUID byte keeps the entry live
        e[ENTRY_LBA_OFFSET..ENTRY_LBA_OFFSET + 8].copy_from_slice(&start_lba.to_le_bytes());
        for (i, b) in name.bytes().enumerate() {
            e[ENTRY_NAME_OFFSET + 2 * i] = b;
        }
        e
    }

    #[test]
    fn corrupted_signature_is_not_a_gpt_disk() {
        let mut buf = table_with_entries(&[entry(0x2000, "uboot")]);
        buf[SECTOR_SIZE] ^= 0xFF;
        assert_eq!(decode_partition_table(&buf), None);
    }

    #[test]
    fn short_buffer_is_not_a_gpt_disk() {
        let buf = vec![0u8; 33 * SECTOR_SIZE];
        assert_eq!(decode_partition_table(&buf), None);
    }

    #[test]
    fn entries_after_sentinel_are_never_decoded() {
        let buf = table_with_entries(&[
            entry(0x2000, "uboot"),
            entry(0x4000, "trust"),
            entry(0x6000, "boot"),
            vec![0u8; ENTRY_SIZE], // sentinel
            entry(0x8000, "rootfs"),
            entry(0xA000, "oem"),
        ]);

        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "uboot");
        assert_eq!(records[2].name, "boot");
        assert_eq!(records[2].index, 2);
    }

    #[test]
    fn name_decoding_stops_at_zero_unit() {
        let buf = table_with_entries(&[entry(0x2000, "root")]);
        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records[0].name, "root");
        assert_eq!(records[0].name.len(), 4);
    }

    #[test]
    fn name_decoding_caps_at_35_characters() {
        let long = "a".repeat(36);
        let buf = table_with_entries(&[entry(0x2000, &long)]);
        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records[0].name.len(), 35);
    }

    #[test]
    fn starting_lba_is_truncated_to_32_bits() {
        let buf = table_with_entries(&[entry(0x1_0000_2000, "big")]);
        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records[0].start_lba, 0x2000);
    }

    #[test]
    fn order_and_indices_are_preserved() {
        let buf = table_with_entries(&[entry(0x4000, "b"), entry(0x2000, "a")]);
        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records[0].start_lba, 0x4000);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].start_lba, 0x2000);
        assert_eq!(records[1].index, 1);
    }

    #[test]
    fn declared_count_larger_than_buffer_truncates_cleanly() {
        let mut buf = table_with_entries(&[entry(0x2000, "uboot")]);
        let header = &mut buf[SECTOR_SIZE..2 * SECTOR_SIZE];
        header[HEADER_ENTRY_COUNT_OFFSET..HEADER_ENTRY_COUNT_OFFSET + 4]
            .copy_from_slice(&4096u32.to_le_bytes());
        let records = decode_partition_table(&buf).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn undersized_entry_size_is_rejected() {
        let mut buf = table_with_entries(&[entry(0x2000, "uboot")]);
        let header = &mut buf[SECTOR_SIZE..2 * SECTOR_SIZE];
        header[HEADER_ENTRY_SIZE_OFFSET..HEADER_ENTRY_SIZE_OFFSET + 4]
            .copy_from_slice(&64u32.to_le_bytes());
        assert_eq!(decode_partition_table(&buf), None);
    }
}
