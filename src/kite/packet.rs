//! Binary market-data frames of the Kite ticker.
//!
//! A frame is a big-endian `u16` packet count followed by that many
//! `[u16 length][packet]` records. Every packet, whatever its mode, starts with
//! the `u32` instrument token and the `i32` last price in the segment's minor
//! unit, so LTP extraction only needs the first eight bytes.

use crate::error::{AppError, KiteResult};

pub const LTP_PACKET_LEN: usize = 8;

const SEGMENT_CDS: u32 = 3;
const SEGMENT_BCD: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LtpPacket {
    pub instrument_token: u32,
    pub last_price: f64,
}

pub fn price_divisor(instrument_token: u32) -> f64 {
    match instrument_token & 0xff {
        SEGMENT_CDS => 10_000_000.0,
        SEGMENT_BCD => 10_000.0,
        _ => 100.0,
    }
}

fn read_u16(buf: &[u8], at: usize) -> KiteResult<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| AppError::WebSocket(format!("frame truncated at byte {}", at)))
}

/// A frame shorter than two bytes is a heartbeat and yields no packets.
pub fn parse_frame(buf: &[u8]) -> KiteResult<Vec<LtpPacket>> {
    if buf.len() < 2 {
        return Ok(Vec::new());
    }
    let count = read_u16(buf, 0)? as usize;
    let mut packets = Vec::with_capacity(count);
    let mut offset = 2;
    for _ in 0..count {
        let len = read_u16(buf, offset)? as usize;
        offset += 2;
        let packet = buf.get(offset..offset + len).ok_or_else(|| {
            AppError::WebSocket(format!(
                "packet of {} bytes overruns frame of {} bytes",
                len,
                buf.len()
            ))
        })?;
        offset += len;
        if len < LTP_PACKET_LEN {
            tracing::debug!(len, "Skipping short ticker packet");
            continue;
        }
        let instrument_token = u32::from_be_bytes([packet[0], packet[1], packet[2], packet[3]]);
        let raw_price = i32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
        packets.push(LtpPacket {
            instrument_token,
            last_price: raw_price as f64 / price_divisor(instrument_token),
        });
    }
    Ok(packets)
}

/// Build a frame in the ticker's layout.
pub fn encode_frame(packets: &[LtpPacket]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + packets.len() * (2 + LTP_PACKET_LEN));
    out.extend_from_slice(&(packets.len() as u16).to_be_bytes());
    for p in packets {
        let raw = (p.last_price * price_divisor(p.instrument_token)).round() as i32;
        out.extend_from_slice(&(LTP_PACKET_LEN as u16).to_be_bytes());
        out.extend_from_slice(&p.instrument_token.to_be_bytes());
        out.extend_from_slice(&raw.to_be_bytes());
    }
    out
}
