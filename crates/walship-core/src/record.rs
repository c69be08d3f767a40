//! WAL Record Payload Codec
//!
//! This module decodes (and, for the writer and tests, encodes) the payloads
//! of the three logical record kinds carried by the collector's WAL.
//!
//! ## Record Layout
//!
//! The first payload byte is the record kind; the rest is kind-specific:
//!
//! ```text
//! Series (kind = 1), repeated per series:
//! ┌──────────┬──────────────┬─────────────────────────────────────┐
//! │ Ref      │ Label count  │ Per label: uvarint-prefixed name,   │
//! │ (u64 BE) │ (uvarint)    │ uvarint-prefixed value              │
//! └──────────┴──────────────┴─────────────────────────────────────┘
//!
//! Samples (kind = 2), one anchor then one entry per sample:
//! ┌───────────┬───────────────┬──────────────────────────────────┐
//! │ First ref │ First ts (ms) │ Per sample: ref delta (varint),  │
//! │ (u64 BE)  │ (i64 BE)      │ ts delta (varint), bits (u64 BE) │
//! └───────────┴───────────────┴──────────────────────────────────┘
//!
//! Tombstones (kind = 3), repeated per interval:
//! ┌───────────────┬───────────────┬───────────────┐
//! │ Ref (uvarint) │ Mint (varint) │ Maxt (varint) │
//! └───────────────┴───────────────┴───────────────┘
//! ```
//!
//! Deltas are taken against the anchor (the first entry encodes delta 0).
//! Sample values are raw IEEE-754 bits, so NaN and ±Inf survive the trip
//! bit-identically.
//!
//! Decoding is fully checked: every length and count is validated against
//! the remaining buffer before use, and failures surface as
//! `Error::Corrupt`.

use crate::error::{Error, Result};
use crate::labels::{Label, Labels};
use crate::varint::{decode_uvarint, decode_varint, encode_uvarint, encode_varint};
use bytes::{Buf, BufMut, BytesMut};

/// Record kind discriminators (first payload byte).
pub const RECORD_SERIES: u8 = 1;
pub const RECORD_SAMPLES: u8 = 2;
pub const RECORD_TOMBSTONES: u8 = 3;

/// One series declaration: a ref bound to its labelled identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDecl {
    pub ref_id: u64,
    pub labels: Labels,
}

/// One scraped sample referring to a previously declared series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ref_id: u64,
    pub timestamp_ms: i64,
    pub value: f64,
}

/// One deletion interval. Decoded for validation, ignored by the forwarder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TombstoneInterval {
    pub ref_id: u64,
    pub min_time_ms: i64,
    pub max_time_ms: i64,
}

/// A decoded logical WAL record.
#[derive(Debug, Clone, PartialEq)]
pub enum WalRecord {
    Series(Vec<SeriesDecl>),
    Samples(Vec<Sample>),
    Tombstones(Vec<TombstoneInterval>),
}

impl WalRecord {
    /// Decode a complete record payload, dispatching on the kind byte.
    pub fn decode(payload: &[u8]) -> Result<WalRecord> {
        let mut buf = payload;
        if !buf.has_remaining() {
            return Err(Error::Corrupt("empty record".to_string()));
        }

        match buf.get_u8() {
            RECORD_SERIES => Ok(WalRecord::Series(decode_series(&mut buf)?)),
            RECORD_SAMPLES => Ok(WalRecord::Samples(decode_samples(&mut buf)?)),
            RECORD_TOMBSTONES => Ok(WalRecord::Tombstones(decode_tombstones(&mut buf)?)),
            kind => Err(Error::Corrupt(format!("unknown record kind: {}", kind))),
        }
    }
}

fn decode_series(buf: &mut &[u8]) -> Result<Vec<SeriesDecl>> {
    let mut decls = Vec::new();

    while buf.has_remaining() {
        if buf.remaining() < 8 {
            return Err(Error::Corrupt("truncated series ref".to_string()));
        }
        let ref_id = buf.get_u64();

        let count = decode_uvarint(buf)?;
        let mut labels = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            let name = decode_string(buf)?;
            let value = decode_string(buf)?;
            labels.push(Label::new(name, value));
        }

        decls.push(SeriesDecl {
            ref_id,
            labels: Labels::new(labels),
        });
    }

    Ok(decls)
}

fn decode_string(buf: &mut &[u8]) -> Result<String> {
    let len = decode_uvarint(buf)? as usize;
    if buf.remaining() < len {
        return Err(Error::Corrupt("label length overruns record".to_string()));
    }
    let bytes = &buf[..len];
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::Corrupt("label is not valid UTF-8".to_string()))?
        .to_string();
    buf.advance(len);
    Ok(s)
}

fn decode_samples(buf: &mut &[u8]) -> Result<Vec<Sample>> {
    if !buf.has_remaining() {
        return Ok(Vec::new());
    }
    if buf.remaining() < 16 {
        return Err(Error::Corrupt("truncated sample anchor".to_string()));
    }

    let base_ref = buf.get_u64();
    let base_time = buf.get_i64();

    let mut samples = Vec::new();
    while buf.has_remaining() {
        let ref_delta = decode_varint(buf)?;
        let time_delta = decode_varint(buf)?;
        if buf.remaining() < 8 {
            return Err(Error::Corrupt("truncated sample value".to_string()));
        }
        let bits = buf.get_u64();

        samples.push(Sample {
            ref_id: (base_ref as i64).wrapping_add(ref_delta) as u64,
            timestamp_ms: base_time.wrapping_add(time_delta),
            value: f64::from_bits(bits),
        });
    }

    Ok(samples)
}

fn decode_tombstones(buf: &mut &[u8]) -> Result<Vec<TombstoneInterval>> {
    let mut intervals = Vec::new();

    while buf.has_remaining() {
        intervals.push(TombstoneInterval {
            ref_id: decode_uvarint(buf)?,
            min_time_ms: decode_varint(buf)?,
            max_time_ms: decode_varint(buf)?,
        });
    }

    Ok(intervals)
}

/// Encode a series-declaration record, including the kind byte.
pub fn encode_series(decls: &[SeriesDecl]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(RECORD_SERIES);

    for decl in decls {
        buf.put_u64(decl.ref_id);
        encode_uvarint(&mut buf, decl.labels.len() as u64);
        for label in decl.labels.iter() {
            encode_uvarint(&mut buf, label.name.len() as u64);
            buf.put_slice(label.name.as_bytes());
            encode_uvarint(&mut buf, label.value.len() as u64);
            buf.put_slice(label.value.as_bytes());
        }
    }

    buf.to_vec()
}

/// Encode a sample record, including the kind byte. An empty batch encodes
/// to the bare kind byte and decodes back to an empty batch.
pub fn encode_samples(samples: &[Sample]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(RECORD_SAMPLES);

    let Some(first) = samples.first() else {
        return buf.to_vec();
    };
    buf.put_u64(first.ref_id);
    buf.put_i64(first.timestamp_ms);

    for sample in samples {
        let ref_delta = (sample.ref_id as i64).wrapping_sub(first.ref_id as i64);
        let time_delta = sample.timestamp_ms.wrapping_sub(first.timestamp_ms);
        encode_varint(&mut buf, ref_delta);
        encode_varint(&mut buf, time_delta);
        buf.put_u64(sample.value.to_bits());
    }

    buf.to_vec()
}

/// Encode a tombstone record, including the kind byte.
pub fn encode_tombstones(intervals: &[TombstoneInterval]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(RECORD_TOMBSTONES);

    for iv in intervals {
        encode_uvarint(&mut buf, iv.ref_id);
        encode_varint(&mut buf, iv.min_time_ms);
        encode_varint(&mut buf, iv.max_time_ms);
    }

    buf.to_vec()
}
