//! Little-endian packet layout for side exchange.
//!
//! A packet is a [`WireSideHeader`] followed by `n_groups * n_face_vertices`
//! `f64` values. Multi-byte integers are stored pre-LE with `.to_le()` and
//! decoded with `from_le`.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireSideHeader {
    pub side_le: u64,
    pub angle_le: u64,
}

impl WireSideHeader {
    pub fn new(global_side: u64, angle: u64) -> Self {
        Self {
            side_le: global_side.to_le(),
            angle_le: angle.to_le(),
        }
    }
    pub fn side(&self) -> u64 {
        u64::from_le(self.side_le)
    }
    pub fn angle(&self) -> u64 {
        u64::from_le(self.angle_le)
    }
}

pub const HEADER_BYTES: usize = size_of::<WireSideHeader>();

/// Bytes per packet for a side block of `block_len` values.
pub fn packet_size(block_len: usize) -> usize {
    HEADER_BYTES + size_of::<f64>() * block_len
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Append one packet to `out`.
pub fn write_packet(out: &mut Vec<u8>, header: WireSideHeader, values: impl IntoIterator<Item = f64>) {
    out.extend_from_slice(bytemuck::bytes_of(&header));
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Split one packet into its header and payload values.
pub fn read_packet(packet: &[u8], block_len: usize) -> Result<(WireSideHeader, Vec<f64>), String> {
    expect_exact_len(packet.len(), packet_size(block_len))?;
    let (head, body) = packet.split_at(HEADER_BYTES);
    let header: WireSideHeader = bytemuck::pod_read_unaligned(head);
    let values = body
        .chunks_exact(size_of::<f64>())
        .map(|c| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(c);
            f64::from_le_bytes(bytes)
        })
        .collect();
    Ok((header, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_sixteen_bytes() {
        assert_eq!(HEADER_BYTES, 16);
        assert_eq!(packet_size(4), 48);
    }

    #[test]
    fn packet_bytes_are_little_endian() {
        let mut buf = Vec::new();
        write_packet(&mut buf, WireSideHeader::new(0x0102, 3), [1.5]);
        assert_eq!(&buf[..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buf[8], 3);
        assert_eq!(&buf[16..], &1.5f64.to_le_bytes());
        let (hdr, vals) = read_packet(&buf, 1).unwrap();
        assert_eq!((hdr.side(), hdr.angle()), (0x0102, 3));
        assert_eq!(vals, vec![1.5]);
    }

    #[test]
    fn short_packet_is_rejected() {
        assert!(read_packet(&[0u8; 20], 1).is_err());
    }
}
