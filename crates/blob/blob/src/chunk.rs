use bytes::Bytes;

/// Default payload chunk size (255 KiB), small enough to keep per-request
/// memory bounded and large enough to keep round-trips low.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Split `data` into consecutive chunks of at most `chunk_size` bytes.
///
/// Chunks share the original buffer; nothing is copied.
pub fn split_chunks(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::with_capacity(data.len().div_ceil(chunk_size));
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk_size).min(data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }
    chunks
}

/// Number of chunks a payload of `size_bytes` occupies.
pub fn chunk_count(size_bytes: u64, chunk_size: usize) -> u64 {
    size_bytes.div_ceil(chunk_size.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_evenly_and_with_remainder() {
        let data = Bytes::from(vec![7u8; 10]);
        let chunks = split_chunks(&data, 4);
        let sizes: Vec<usize> = chunks.iter().map(Bytes::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(chunk_count(10, 4), 3);
        assert_eq!(chunk_count(8, 4), 2);
    }

    #[test]
    fn empty_payload_has_no_chunks() {
        assert!(split_chunks(&Bytes::new(), 4).is_empty());
        assert_eq!(chunk_count(0, 4), 0);
    }

    #[test]
    fn chunks_reassemble() {
        let data = Bytes::from((0..=255u8).cycle().take(1000).collect::<Vec<_>>());
        let joined: Vec<u8> = split_chunks(&data, 333).concat();
        assert_eq!(joined, data.to_vec());
    }
}
