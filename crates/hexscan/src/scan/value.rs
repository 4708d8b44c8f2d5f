//! Typed value scanning ("first scan" / "next scan")
//!
//! A first scan walks regions at a fixed alignment, decoding a value of one
//! [`ValueType`] at every step and keeping the addresses whose value passes
//! a [`Comparison`]. A next scan re-reads only those addresses and narrows
//! the set, comparing against the value recorded by the previous pass.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

use super::constants::{FLOAT_EPSILON, MIN_CHUNK_SIZE};
use super::scanner::ScanConfig;
use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ReadMemory};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ValueType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ValueType {
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Parse `text` as a value of this type.
    pub fn parse(self, text: &str) -> Result<Value> {
        let text = text.trim();
        let invalid = |e: &dyn fmt::Display| {
            Error::InvalidScan(format!("'{}' is not a valid {}: {}", text, self, e))
        };

        Ok(match self {
            Self::I8 => Value::I8(text.parse().map_err(|e| invalid(&e))?),
            Self::U8 => Value::U8(text.parse().map_err(|e| invalid(&e))?),
            Self::I16 => Value::I16(text.parse().map_err(|e| invalid(&e))?),
            Self::U16 => Value::U16(text.parse().map_err(|e| invalid(&e))?),
            Self::I32 => Value::I32(text.parse().map_err(|e| invalid(&e))?),
            Self::U32 => Value::U32(text.parse().map_err(|e| invalid(&e))?),
            Self::I64 => Value::I64(text.parse().map_err(|e| invalid(&e))?),
            Self::U64 => Value::U64(text.parse().map_err(|e| invalid(&e))?),
            Self::F32 => Value::F32(text.parse().map_err(|e| invalid(&e))?),
            Self::F64 => Value::F64(text.parse().map_err(|e| invalid(&e))?),
        })
    }

    /// Decode a little-endian value from the start of `bytes`.
    pub fn decode(self, bytes: &[u8]) -> Option<Value> {
        macro_rules! le {
            ($variant:ident, $ty:ty) => {
                Value::$variant(<$ty>::from_le_bytes(
                    bytes.get(..size_of::<$ty>())?.try_into().ok()?,
                ))
            };
        }

        Some(match self {
            Self::I8 => le!(I8, i8),
            Self::U8 => le!(U8, u8),
            Self::I16 => le!(I16, i16),
            Self::U16 => le!(U16, u16),
            Self::I32 => le!(I32, i32),
            Self::U32 => le!(U32, u32),
            Self::I64 => le!(I64, i64),
            Self::U64 => le!(U64, u64),
            Self::F32 => le!(F32, f32),
            Self::F64 => le!(F64, f64),
        })
    }
}

/// A typed value read from (or compared against) process memory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::I8(_) => ValueType::I8,
            Self::U8(_) => ValueType::U8,
            Self::I16(_) => ValueType::I16,
            Self::U16(_) => ValueType::U16,
            Self::I32(_) => ValueType::I32,
            Self::U32(_) => ValueType::U32,
            Self::I64(_) => ValueType::I64,
            Self::U64(_) => ValueType::U64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Self::I8(v) => v.to_le_bytes().to_vec(),
            Self::U8(v) => v.to_le_bytes().to_vec(),
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    fn number(&self) -> Number {
        match *self {
            Self::I8(v) => Number::Int(v.into()),
            Self::U8(v) => Number::Int(v.into()),
            Self::I16(v) => Number::Int(v.into()),
            Self::U16(v) => Number::Int(v.into()),
            Self::I32(v) => Number::Int(v.into()),
            Self::U32(v) => Number::Int(v.into()),
            Self::I64(v) => Number::Int(v.into()),
            Self::U64(v) => Number::Int(v.into()),
            Self::F32(v) => Number::Float(v.into()),
            Self::F64(v) => Number::Float(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Common numeric view: every integer type fits in `i128`.
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    fn approx_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => (self.as_f64() - other.as_f64()).abs() < FLOAT_EPSILON,
        }
    }

    fn compare(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    fn minus(self, other: Self) -> Self {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a - b),
            _ => Self::Float(self.as_f64() - other.as_f64()),
        }
    }
}

/// How a candidate value is tested
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Equal(Value),
    Bigger(Value),
    Smaller(Value),
    /// Strictly between the two bounds
    Range(Value, Value),
    Increased,
    IncreasedBy(Value),
    Decreased,
    DecreasedBy(Value),
    Changed,
    Unchanged,
    /// Every value matches; narrows later with a next scan
    Unknown,
}

impl Comparison {
    /// Whether the comparison is relative to a previously recorded value.
    pub fn needs_previous(&self) -> bool {
        matches!(
            self,
            Self::Increased
                | Self::IncreasedBy(_)
                | Self::Decreased
                | Self::DecreasedBy(_)
                | Self::Changed
                | Self::Unchanged
        )
    }

    pub fn matches(&self, current: &Value, previous: Option<&Value>) -> bool {
        let now = current.number();
        let ordering = |operand: &Value| now.compare(operand.number());

        match (self, previous) {
            (Self::Equal(v), _) => now.approx_eq(v.number()),
            (Self::Bigger(v), _) => ordering(v) == Some(Ordering::Greater),
            (Self::Smaller(v), _) => ordering(v) == Some(Ordering::Less),
            (Self::Range(min, max), _) => {
                ordering(min) == Some(Ordering::Greater) && ordering(max) == Some(Ordering::Less)
            }
            (Self::Unknown, _) => true,
            (Self::Increased, Some(prev)) => ordering(prev) == Some(Ordering::Greater),
            (Self::Decreased, Some(prev)) => ordering(prev) == Some(Ordering::Less),
            (Self::IncreasedBy(delta), Some(prev)) => {
                now.minus(prev.number()).approx_eq(delta.number())
            }
            (Self::DecreasedBy(delta), Some(prev)) => {
                prev.number().minus(now).approx_eq(delta.number())
            }
            (Self::Changed, Some(prev)) => current.to_le_bytes() != prev.to_le_bytes(),
            (Self::Unchanged, Some(prev)) => current.to_le_bytes() == prev.to_le_bytes(),
            (_, None) => false,
        }
    }
}

/// An address kept by a value scan and the value it held at that time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueHit {
    pub address: u64,
    pub value: Value,
}

/// Outcome of a first or next scan, the input of the next one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueScanResults {
    pub value_type: ValueType,
    pub hits: Vec<ValueHit>,
    /// Candidate positions examined
    pub scanned: u64,
}

impl ValueScanResults {
    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.hits.iter().map(|h| h.address)
    }
}

pub struct ValueScanner<'a, R: ReadMemory> {
    reader: &'a R,
    value_type: ValueType,
    alignment: usize,
    config: ScanConfig,
}

impl<'a, R: ReadMemory> ValueScanner<'a, R> {
    /// Scanner stepping by the size of `value_type`.
    pub fn new(reader: &'a R, value_type: ValueType, config: ScanConfig) -> Self {
        Self {
            reader,
            value_type,
            alignment: value_type.size(),
            config,
        }
    }

    /// Distance between candidate positions, counted from each region start.
    pub fn alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment.max(1);
        self
    }

    /// Test every aligned position of `regions`.
    ///
    /// Unreadable chunks are skipped; `config.limit` caps the hit count.
    pub fn first_scan(
        &self,
        regions: &[MemoryRegion],
        comparison: &Comparison,
    ) -> Result<ValueScanResults> {
        if comparison.needs_previous() {
            return Err(Error::InvalidScan(format!(
                "{:?} needs a previous scan",
                comparison
            )));
        }

        let size = self.value_type.size();
        let step = self.alignment;
        // Chunks are whole multiples of the step so positions stay aligned
        let chunk = self.config.chunk_size.max(MIN_CHUNK_SIZE).div_ceil(step) * step;
        let limit = self.config.limit.unwrap_or(usize::MAX);

        let mut hits = Vec::new();
        let mut scanned = 0u64;

        'regions: for region in regions {
            let mut addr = region.start;
            while addr < region.end {
                let chunk_end = addr.saturating_add(chunk as u64).min(region.end);
                // Read past the chunk so the last positions hold a whole value
                let read_end = chunk_end.saturating_add(size as u64 - 1).min(region.end);

                let data = match self.reader.read_bytes(addr, (read_end - addr) as usize) {
                    Ok(data) => data,
                    Err(e) if e.is_recoverable() => {
                        debug!("Skipping unreadable chunk at 0x{:X}: {}", addr, e);
                        addr = chunk_end;
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let positions = (chunk_end - addr) as usize;
                for offset in (0..positions).step_by(step) {
                    let Some(value) = data.get(offset..offset + size).and_then(|b| self.value_type.decode(b))
                    else {
                        break;
                    };
                    scanned += 1;
                    if comparison.matches(&value, None) {
                        hits.push(ValueHit {
                            address: addr + offset as u64,
                            value,
                        });
                        if hits.len() >= limit {
                            break 'regions;
                        }
                    }
                }

                addr = chunk_end;
            }
        }

        info!(
            "First scan ({}, {:?}): {} of {} position(s) match",
            self.value_type,
            comparison,
            hits.len(),
            scanned
        );
        Ok(ValueScanResults {
            value_type: self.value_type,
            hits,
            scanned,
        })
    }

    /// Re-read the addresses of `previous` and keep those passing
    /// `comparison`, recording their current values.
    ///
    /// Addresses that became unreadable are dropped.
    pub fn next_scan(
        &self,
        previous: &ValueScanResults,
        comparison: &Comparison,
    ) -> Result<ValueScanResults> {
        if previous.value_type != self.value_type {
            return Err(Error::InvalidScan(format!(
                "previous scan holds {} values, not {}",
                previous.value_type, self.value_type
            )));
        }

        let size = self.value_type.size();
        let mut hits = Vec::new();

        for hit in &previous.hits {
            let bytes = match self.reader.read_bytes(hit.address, size) {
                Ok(bytes) => bytes,
                Err(e) if e.is_recoverable() => {
                    debug!("Dropping 0x{:X}: {}", hit.address, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(value) = self.value_type.decode(&bytes) else {
                continue;
            };
            if comparison.matches(&value, Some(&hit.value)) {
                hits.push(ValueHit {
                    address: hit.address,
                    value,
                });
            }
        }

        info!(
            "Next scan ({:?}): {} of {} address(es) remain",
            comparison,
            hits.len(),
            previous.hits.len()
        );
        Ok(ValueScanResults {
            value_type: self.value_type,
            hits,
            scanned: previous.hits.len() as u64,
        })
    }
}
