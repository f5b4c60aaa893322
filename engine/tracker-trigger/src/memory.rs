//! Lookup memories: fixed address/data width tables used by the tracker
//! pattern logic, with a plain-text file format.
//!
//! ```text
//! #@description = Layer projection to inner/outer code
//! #@address_size = 9
//! #@data_size = 2
//! #@registered_value = BOTH : 11
//! #@default_data = 00
//! 000000011 01
//! 111111111 BOTH
//! ```
//!
//! Bit strings are written most significant bit first. Metadata lines must all
//! come before the first body line. `store` only writes entries that differ
//! from the default data.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;
use trigger_model::{Result, TriggerError};

pub const MAX_ADDRESS_BITS: u32 = 16;
pub const MAX_DATA_BITS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupMemory {
    description: String,
    address_bits: u32,
    data_bits: u32,
    default_data: u16,
    entries: BTreeMap<u32, u16>,
}

impl LookupMemory {
    pub fn new(address_bits: u32, data_bits: u32, default_data: u16) -> Result<Self> {
        if address_bits == 0 || address_bits > MAX_ADDRESS_BITS {
            return Err(TriggerError::config(format!("memory address size {address_bits} outside 1..={MAX_ADDRESS_BITS}")));
        }
        if data_bits == 0 || data_bits > MAX_DATA_BITS {
            return Err(TriggerError::config(format!("memory data size {data_bits} outside 1..={MAX_DATA_BITS}")));
        }
        if u32::from(default_data) >> data_bits != 0 {
            return Err(TriggerError::config(format!("default data {default_data:#b} wider than {data_bits} bits")));
        }
        Ok(Self { description: String::new(), address_bits, data_bits, default_data, entries: BTreeMap::new() })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Memory filled by evaluating `f` on every address.
    pub fn from_fn(address_bits: u32, data_bits: u32, f: impl Fn(u32) -> u16) -> Result<Self> {
        let mut memory = Self::new(address_bits, data_bits, 0)?;
        for address in 0..memory.number_of_addresses() {
            memory.push(address, f(address))?;
        }
        Ok(memory)
    }

    #[inline]
    pub fn address_bits(&self) -> u32 {
        self.address_bits
    }
    #[inline]
    pub fn data_bits(&self) -> u32 {
        self.data_bits
    }
    #[inline]
    pub fn default_data(&self) -> u16 {
        self.default_data
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn number_of_addresses(&self) -> u32 {
        1 << self.address_bits
    }
    /// Number of explicitly stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_address(&self, address: u32) -> Result<()> {
        if address >> self.address_bits != 0 {
            return Err(TriggerError::range("memory address", address, self.number_of_addresses()));
        }
        Ok(())
    }

    pub fn push(&mut self, address: u32, data: u16) -> Result<()> {
        self.check_address(address)?;
        if u32::from(data) >> self.data_bits != 0 {
            return Err(TriggerError::range("memory data", data, 1u32 << self.data_bits));
        }
        self.entries.insert(address, data);
        Ok(())
    }

    /// Data stored at `address`, or the default data when nothing was pushed there.
    pub fn fetch(&self, address: u32) -> Result<u16> {
        self.check_address(address)?;
        Ok(self.entries.get(&address).copied().unwrap_or(self.default_data))
    }

    /// Fails unless the memory has exactly the given shape.
    pub fn expect_shape(&self, name: &str, address_bits: u32, data_bits: u32) -> Result<()> {
        if self.address_bits != address_bits || self.data_bits != data_bits {
            return Err(TriggerError::config(format!(
                "{name} memory must be A{address_bits}D{data_bits}, got A{}D{}",
                self.address_bits, self.data_bits
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let memory = Self::from_reader(BufReader::new(File::open(path)?))
            .map_err(|e| match e {
                TriggerError::Configuration(msg) => TriggerError::config(format!("{}: {msg}", path.display())),
                other => other,
            })?;
        debug!("Loaded A{}D{} memory from {}", memory.address_bits, memory.data_bits, path.display());
        Ok(memory)
    }

    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.to_writer(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn to_writer(&self, out: &mut impl Write) -> Result<()> {
        if !self.description.is_empty() {
            writeln!(out, "#@description = {}", self.description)?;
        }
        writeln!(out, "#@address_size = {}", self.address_bits)?;
        writeln!(out, "#@data_size = {}", self.data_bits)?;
        writeln!(out, "#@default_data = {}", to_bits(self.default_data.into(), self.data_bits))?;
        for (&address, &data) in &self.entries {
            if data != self.default_data {
                writeln!(out, "{} {}", to_bits(address, self.address_bits), to_bits(data.into(), self.data_bits))?;
            }
        }
        Ok(())
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut description = String::new();
        let mut address_bits = None;
        let mut data_bits = None;
        let mut default_text: Option<String> = None;
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        let mut memory: Option<LookupMemory> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let lineno = index + 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(meta) = text.strip_prefix("#@") {
                if memory.is_some() {
                    return Err(TriggerError::config(format!("line {lineno}: metadata after the memory body")));
                }
                let (key, value) = meta
                    .split_once('=')
                    .ok_or_else(|| TriggerError::config(format!("line {lineno}: expected `key = value`")))?;
                let value = value.trim();
                match key.trim() {
                    "description" => description = value.to_string(),
                    "address_size" => address_bits = Some(parse_size(value, lineno)?),
                    "data_size" => data_bits = Some(parse_size(value, lineno)?),
                    "default_data" => default_text = Some(value.to_string()),
                    "registered_value" => {
                        let (label, bits) = value.split_once(':').ok_or_else(|| {
                            TriggerError::config(format!("line {lineno}: expected `LABEL : bits`"))
                        })?;
                        labels.insert(label.trim().to_string(), bits.trim().to_string());
                    }
                    other => {
                        return Err(TriggerError::config(format!("line {lineno}: unsupported metadata `{other}`")));
                    }
                }
                continue;
            }
            if text.starts_with('#') {
                continue;
            }

            if memory.is_none() {
                memory = Some(Self::from_header(
                    address_bits,
                    data_bits,
                    default_text.as_deref(),
                    &labels,
                    &description,
                    lineno,
                )?);
            }
            let Some(mem) = memory.as_mut() else { continue };
            let mut words = text.split_whitespace();
            let (Some(address), Some(data), None) = (words.next(), words.next(), words.next()) else {
                return Err(TriggerError::config(format!("line {lineno}: expected `<address> <data>`")));
            };
            let address = parse_bits(address, mem.address_bits, lineno)?;
            let data = resolve_data(data, &labels, mem.data_bits, lineno)?;
            mem.push(address, data)?;
        }

        match memory {
            Some(memory) => Ok(memory),
            None => Self::from_header(address_bits, data_bits, default_text.as_deref(), &labels, &description, 0),
        }
    }

    fn from_header(
        address_bits: Option<u32>,
        data_bits: Option<u32>,
        default_text: Option<&str>,
        labels: &BTreeMap<String, String>,
        description: &str,
        lineno: usize,
    ) -> Result<Self> {
        let address_bits =
            address_bits.ok_or_else(|| TriggerError::config("memory file has no `#@address_size`"))?;
        let data_bits = data_bits.ok_or_else(|| TriggerError::config("memory file has no `#@data_size`"))?;
        let default_data = match default_text {
            Some(text) => resolve_data(text, labels, data_bits, lineno)?,
            None => 0,
        };
        Ok(Self::new(address_bits, data_bits, default_data)?.with_description(description))
    }
}

fn parse_size(value: &str, lineno: usize) -> Result<u32> {
    value.parse().map_err(|_| TriggerError::config(format!("line {lineno}: invalid size `{value}`")))
}

fn parse_bits(text: &str, width: u32, lineno: usize) -> Result<u32> {
    if text.len() != width as usize {
        return Err(TriggerError::config(format!("line {lineno}: `{text}` is not a {width}-bit word")));
    }
    text.bytes().try_fold(0u32, |acc, c| match c {
        b'0' => Ok(acc << 1),
        b'1' => Ok(acc << 1 | 1),
        _ => Err(TriggerError::config(format!("line {lineno}: invalid bit in `{text}`"))),
    })
}

fn resolve_data(text: &str, labels: &BTreeMap<String, String>, width: u32, lineno: usize) -> Result<u16> {
    let bits = labels.get(text).map(String::as_str).unwrap_or(text);
    Ok(parse_bits(bits, width, lineno)? as u16)
}

fn to_bits(value: u32, width: u32) -> String {
    (0..width).rev().map(|i| if value >> i & 1 == 1 { '1' } else { '0' }).collect()
}

/// Track class produced by the A4D2 memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackClass {
    Void,
    PreTrack,
    FullTrack,
}

impl TrackClass {
    pub const VOID_CODE: u16 = 0b00;
    pub const PRE_TRACK_CODE: u16 = 0b11;
    pub const FULL_TRACK_CODE: u16 = 0b01;

    pub fn code(&self) -> u16 {
        match self {
            TrackClass::Void => Self::VOID_CODE,
            TrackClass::PreTrack => Self::PRE_TRACK_CODE,
            TrackClass::FullTrack => Self::FULL_TRACK_CODE,
        }
    }

    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            Self::VOID_CODE => Ok(TrackClass::Void),
            Self::PRE_TRACK_CODE => Ok(TrackClass::PreTrack),
            Self::FULL_TRACK_CODE => Ok(TrackClass::FullTrack),
            other => Err(TriggerError::invariant(format!("undefined track class code {other:02b}"))),
        }
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, TrackClass::Void)
    }
}

/// 1 when at least `min` address bits are set.
pub fn min_multiplicity(address_bits: u32, min: u32) -> Result<LookupMemory> {
    if min > address_bits {
        return Err(TriggerError::config(format!("minimum multiplicity {min} above address size {address_bits}")));
    }
    Ok(LookupMemory::from_fn(address_bits, 1, |a| u16::from(a.count_ones() >= min))?
        .with_description(format!("A{address_bits}D1 minimum multiplicity {min}")))
}

/// 1 when at least two address bits are set and the smallest gap between two
/// consecutive set bits is at most `max_gap`.
pub fn max_gap(address_bits: u32, max_gap: u32) -> Result<LookupMemory> {
    if max_gap > address_bits {
        return Err(TriggerError::config(format!("maximum gap {max_gap} above address size {address_bits}")));
    }
    Ok(LookupMemory::from_fn(address_bits, 1, |a| {
        let set: Vec<u32> = (0..address_bits).filter(|i| a >> i & 1 == 1).collect();
        let smallest = set.windows(2).map(|w| w[1] - w[0] - 1).min();
        u16::from(smallest.is_some_and(|g| g <= max_gap))
    })?
    .with_description(format!("A{address_bits}D1 maximum gap {max_gap}")))
}

/// Quadrant word to track class: none set is VOID, one PRE_TRACK, more FULL_TRACK.
pub fn track_class_a4d2() -> Result<LookupMemory> {
    Ok(LookupMemory::from_fn(4, 2, |a| match a.count_ones() {
        0 => TrackClass::VOID_CODE,
        1 => TrackClass::PRE_TRACK_CODE,
        _ => TrackClass::FULL_TRACK_CODE,
    })?
    .with_description("A4D2 track class"))
}

/// Layer projection (9 layers) to IO code: bit 0 inner, bit 1 outer.
pub fn layer_io(min: u32) -> Result<LookupMemory> {
    Ok(LookupMemory::from_fn(9, 2, |a| {
        let inner = (a & 0x1F).count_ones() >= min;
        let outer = (a & 0x1F0).count_ones() >= min;
        u16::from(inner) | u16::from(outer) << 1
    })?
    .with_description(format!("A9D2 layer projection, inner/outer multiplicity {min}")))
}

/// Sliding-zone row projection (8 rows) to LR code: bit 0 right, bit 1 left.
pub fn row_lr() -> Result<LookupMemory> {
    Ok(LookupMemory::from_fn(8, 2, |a| u16::from(a & 0x0F != 0) | u16::from(a & 0xF0 != 0) << 1)?
        .with_description("A8D2 sliding zone row projection"))
}

/// Zone row projection (up to 12 rows) to RML code: bit 0 right, bit 1
/// middle, bit 2 left.
pub fn zone_row_rml() -> Result<LookupMemory> {
    Ok(LookupMemory::from_fn(12, 3, |a| {
        u16::from(a & 0x00F != 0) | u16::from(a & 0x0F0 != 0) << 1 | u16::from(a & 0xF00 != 0) << 2
    })?
    .with_description("A12D3 zone row projection"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_falls_back_to_default() {
        let mut memory = LookupMemory::new(4, 2, 0b10).unwrap();
        memory.push(3, 0b01).unwrap();
        assert_eq!(memory.fetch(3).unwrap(), 0b01);
        assert_eq!(memory.fetch(4).unwrap(), 0b10);
        assert!(matches!(memory.fetch(16), Err(TriggerError::Range { .. })));
        assert!(memory.push(0, 0b100).is_err());
    }

    #[test]
    fn min_multiplicity_threshold() {
        let memory = min_multiplicity(5, 3).unwrap();
        assert_eq!(memory.fetch(0b00111).unwrap(), 1);
        assert_eq!(memory.fetch(0b10001).unwrap(), 0);
        assert_eq!(memory.fetch(0b11111).unwrap(), 1);
        assert!(min_multiplicity(5, 6).is_err());
    }

    #[test]
    fn max_gap_threshold() {
        let memory = max_gap(5, 1).unwrap();
        assert_eq!(memory.fetch(0b00001).unwrap(), 0);
        assert_eq!(memory.fetch(0b00101).unwrap(), 1);
        assert_eq!(memory.fetch(0b10001).unwrap(), 0);
        assert_eq!(memory.fetch(0b10011).unwrap(), 1);
    }

    #[test]
    fn track_classes() {
        let memory = track_class_a4d2().unwrap();
        assert_eq!(TrackClass::from_code(memory.fetch(0).unwrap()).unwrap(), TrackClass::Void);
        assert_eq!(TrackClass::from_code(memory.fetch(0b0100).unwrap()).unwrap(), TrackClass::PreTrack);
        assert_eq!(TrackClass::from_code(memory.fetch(0b0110).unwrap()).unwrap(), TrackClass::FullTrack);
        assert!(TrackClass::from_code(0b10).is_err());
        assert!(TrackClass::FullTrack > TrackClass::PreTrack);
    }

    #[test]
    fn default_projection_memories() {
        let layer = layer_io(2).unwrap();
        assert_eq!(layer.fetch(0b000000011).unwrap(), 0b01);
        assert_eq!(layer.fetch(0b110000000).unwrap(), 0b10);
        assert_eq!(layer.fetch(0b000011000).unwrap(), 0b01);
        assert_eq!(layer.fetch(0b000111000).unwrap(), 0b11);
        let row = row_lr().unwrap();
        assert_eq!(row.fetch(0b1000_0000).unwrap(), 0b10);
        assert_eq!(row.fetch(0b0000_0001).unwrap(), 0b01);
        let zone = zone_row_rml().unwrap();
        assert_eq!(zone.fetch(0b0001_0000_0000).unwrap(), 0b100);
        assert_eq!(zone.fetch(0b0000_0001_0001).unwrap(), 0b011);
    }

    #[test]
    fn text_format_with_labels() {
        let text = "\
#@description = test memory
#@address_size = 3
#@data_size = 2
#@registered_value = BOTH : 11
#@default_data = 01
# a plain comment
000 00
111 BOTH
";
        let memory = LookupMemory::from_reader(text.as_bytes()).unwrap();
        assert_eq!(memory.description(), "test memory");
        assert_eq!(memory.default_data(), 0b01);
        assert_eq!(memory.fetch(0).unwrap(), 0b00);
        assert_eq!(memory.fetch(0b111).unwrap(), 0b11);
        assert_eq!(memory.fetch(0b010).unwrap(), 0b01);
    }

    #[test]
    fn metadata_after_body_is_rejected() {
        let text = "#@address_size = 2\n#@data_size = 1\n01 1\n#@default_data = 0\n";
        let err = LookupMemory::from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{err}");
    }

    #[test]
    fn malformed_words_are_rejected() {
        let text = "#@address_size = 2\n#@data_size = 1\n011 1\n";
        assert!(LookupMemory::from_reader(text.as_bytes()).is_err());
        let text = "#@address_size = 2\n#@data_size = 1\n0x 1\n";
        assert!(LookupMemory::from_reader(text.as_bytes()).is_err());
        let text = "#@data_size = 1\n01 1\n";
        assert!(LookupMemory::from_reader(text.as_bytes()).is_err());
        let text = "#@address_size = 2\n#@data_size = 1\n#@colour = blue\n";
        assert!(LookupMemory::from_reader(text.as_bytes()).is_err());
    }

    #[test]
    fn store_then_load_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.mem");
        let memory = layer_io(2).unwrap();
        memory.store(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#@description = A9D2"));
        assert!(!text.contains("000000000 00"));

        let back = LookupMemory::load(&path).unwrap();
        for address in 0..back.number_of_addresses() {
            assert_eq!(back.fetch(address).unwrap(), memory.fetch(address).unwrap());
        }
        assert!(LookupMemory::load(dir.path().join("missing.mem")).is_err());
    }
}
