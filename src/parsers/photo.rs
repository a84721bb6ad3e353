//! Embedded photo-metadata extractor.
//!
//! Scans a JPEG byte buffer marker by marker looking for the one APP1
//! segment whose payload opens with the `Exif\0\0` signature. Scanning
//! stops with "no metadata" the moment start-of-scan or end-of-image
//! appears first - metadata cannot legally follow compressed data. A
//! foreign APP1 payload (XMP etc.) is skipped as absent, not treated as an
//! error.
//!
//! Inside a validated container sits a TIFF structure: a byte-order marker
//! selects little- or big-endian reads for flat tagged directories of
//! self-describing 12-byte entries, so unknown tags are skippable. Every
//! directory and value read is bounds-checked; a declared length that
//! would read past the buffer end is a fatal, propagated error - never
//! silently clamped.

use crate::dates;
use crate::error::FatalError;
use crate::models::{CanonicalEvent, GeoLocation, ImportOptions, Layer, Source};
use crate::parsers::ParseOutcome;

const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP1: u8 = 0xE1;
const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";

// IFD0 tags
const TAG_DESCRIPTION: u16 = 0x010E;
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_SOFTWARE: u16 = 0x0131;
const TAG_DATETIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
// Sub-directory tags
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
const TAG_DATETIME_DIGITIZED: u16 = 0x9004;
// GPS directory tags
const TAG_GPS_LAT_REF: u16 = 0x0001;
const TAG_GPS_LAT: u16 = 0x0002;
const TAG_GPS_LON_REF: u16 = 0x0003;
const TAG_GPS_LON: u16 = 0x0004;
const TAG_GPS_ALT_REF: u16 = 0x0005;
const TAG_GPS_ALT: u16 = 0x0006;

/// A GPS fix assembled from degree/minute/second rational triplets and
/// hemisphere references.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: Option<f64>,
}

/// Everything the extractor can pull out of one metadata container. Date
/// fields stay raw strings so the caller can run them through the shared
/// dialect resolution as a priority chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMeta {
    pub capture: Option<String>,
    pub digitized: Option<String>,
    pub modified: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub orientation: Option<u16>,
    pub description: Option<String>,
    pub gps: Option<GpsFix>,
}

/// Locate and read the metadata container.
///
/// `Ok(None)` means the buffer has no readable metadata (not an error);
/// `Err` means the buffer lies about its own structure.
pub fn extract(bytes: &[u8], item: &str) -> Result<Option<PhotoMeta>, FatalError> {
    if bytes.len() < 2 || bytes[0] != 0xFF || bytes[1] != MARKER_SOI {
        return Ok(None);
    }

    let mut offset = 2usize;
    loop {
        // Markers are FF-prefixed; anything else means the stream is not
        // marker-aligned here and holds no container we can trust.
        if offset + 2 > bytes.len() || bytes[offset] != 0xFF {
            return Ok(None);
        }
        // Fill bytes before a marker are legal padding.
        while offset + 1 < bytes.len() && bytes[offset + 1] == 0xFF {
            offset += 1;
        }
        if offset + 2 > bytes.len() {
            return Ok(None);
        }
        let marker = bytes[offset + 1];
        offset += 2;

        match marker {
            // Metadata cannot follow the start of compressed data or the
            // end of the image.
            MARKER_SOS | MARKER_EOI => return Ok(None),
            // Standalone markers carry no length.
            MARKER_SOI | 0x01 | 0xD0..=0xD7 => continue,
            _ => {
                if offset + 2 > bytes.len() {
                    return Err(FatalError::SegmentOverrun {
                        item: item.to_string(),
                        offset,
                        declared: 2,
                        remaining: bytes.len() - offset,
                    });
                }
                let declared =
                    u16::from_be_bytes([bytes[offset], bytes[offset + 1]]) as usize;
                if declared < 2 {
                    return Err(FatalError::Invariant {
                        item: item.to_string(),
                        message: format!("segment length {} below marker minimum", declared),
                    });
                }
                if offset + declared > bytes.len() {
                    return Err(FatalError::SegmentOverrun {
                        item: item.to_string(),
                        offset,
                        declared,
                        remaining: bytes.len() - offset,
                    });
                }
                let payload = &bytes[offset + 2..offset + declared];
                if marker == MARKER_APP1 && payload.starts_with(EXIF_SIGNATURE) {
                    let tiff = &payload[EXIF_SIGNATURE.len()..];
                    return read_container(tiff, item).map(Some);
                }
                offset += declared;
            }
        }
    }
}

/// Parse one photo item into at most one media event.
pub fn parse(bytes: &[u8], name: &str, opts: &ImportOptions) -> Result<ParseOutcome, FatalError> {
    let mut outcome = ParseOutcome::default();
    let Some(meta) = extract(bytes, name)? else {
        outcome.records_skipped += 1;
        return Ok(outcome);
    };

    // Capture time is authoritative; the name-embedded date is a last
    // resort for containers that carry camera fields but no clock.
    let start = dates::best_of(
        [meta.capture.as_deref(), meta.digitized.as_deref(), meta.modified.as_deref()],
        opts.date_order,
    )
    .or_else(|| dates::from_path(name));
    let Some(start) = start else {
        outcome.records_skipped += 1;
        return Ok(outcome);
    };

    let title = meta.description.clone().unwrap_or_else(|| name.to_string());
    let event = match CanonicalEvent::new(&opts.user_id, &title, start, Source::Photo) {
        Ok(event) => event,
        Err(constraint) => {
            outcome.issues.push(format!("photo record dropped: {}", constraint));
            return Ok(outcome);
        }
    };
    let mut event =
        event.with_layer(Layer::Media).with_event_type("photo").with_media(vec![name.to_string()]);

    if let Some(desc) = &meta.description {
        event = event.with_description(desc);
    }
    if let Some(make) = &meta.make {
        event = event.with_metadata("camera_make", make);
    }
    if let Some(model) = &meta.model {
        event = event.with_metadata("camera_model", model);
    }
    if let Some(software) = &meta.software {
        event = event.with_metadata("software", software);
    }
    if let Some(orientation) = meta.orientation {
        event = event.with_metadata("orientation", orientation.to_string());
    }
    if let Some(gps) = &meta.gps
        && let Some(mut location) = GeoLocation::new(gps.lat, gps.lon)
    {
        if let Some(alt) = gps.altitude_m {
            location = location.with_altitude(alt);
        }
        event = event.with_location(location);
    }

    outcome.events.push(event);
    Ok(outcome)
}

/// Bounds-checked reader over the TIFF body of a validated container.
struct Reader<'a> {
    data: &'a [u8],
    little_endian: bool,
    item: &'a str,
}

impl<'a> Reader<'a> {
    fn overrun(&self, offset: usize, wanted: usize) -> FatalError {
        FatalError::SegmentOverrun {
            item: self.item.to_string(),
            offset,
            declared: wanted,
            remaining: self.data.len().saturating_sub(offset),
        }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], FatalError> {
        self.data
            .get(offset..offset.checked_add(len).ok_or_else(|| self.overrun(offset, len))?)
            .ok_or_else(|| self.overrun(offset, len))
    }

    fn u16_at(&self, offset: usize) -> Result<u16, FatalError> {
        let b = self.slice(offset, 2)?;
        Ok(if self.little_endian {
            u16::from_le_bytes([b[0], b[1]])
        } else {
            u16::from_be_bytes([b[0], b[1]])
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, FatalError> {
        let b = self.slice(offset, 4)?;
        Ok(if self.little_endian {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        })
    }
}

/// Byte size of one value of a TIFF field type; None for types this reader
/// has no use for (their entries are skipped, not failed).
fn type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 7 => Some(1), // BYTE, ASCII, UNDEFINED
        3 => Some(2),         // SHORT
        4 | 9 => Some(4),     // LONG, SLONG
        5 | 10 => Some(8),    // RATIONAL, SRATIONAL
        _ => None,
    }
}

/// One directory entry with its value bytes resolved (inline or offset).
struct Entry<'a> {
    tag: u16,
    field_type: u16,
    count: u32,
    value: &'a [u8],
}

fn read_container(tiff: &[u8], item: &str) -> Result<PhotoMeta, FatalError> {
    if tiff.len() < 8 {
        return Err(FatalError::Invariant {
            item: item.to_string(),
            message: "metadata container shorter than its fixed header".to_string(),
        });
    }
    let little_endian = match &tiff[0..2] {
        b"II" => true,
        b"MM" => false,
        other => {
            return Err(FatalError::Invariant {
                item: item.to_string(),
                message: format!("unknown byte-order marker {:02X}{:02X}", other[0], other[1]),
            });
        }
    };
    let reader = Reader { data: tiff, little_endian, item };
    if reader.u16_at(2)? != 42 {
        return Err(FatalError::Invariant {
            item: item.to_string(),
            message: "bad magic in metadata container header".to_string(),
        });
    }

    let mut meta = PhotoMeta::default();
    let ifd0 = reader.u32_at(4)? as usize;

    let mut exif_ifd: Option<usize> = None;
    let mut gps_ifd: Option<usize> = None;

    walk_ifd(&reader, ifd0, |entry| {
        match entry.tag {
            TAG_DATETIME => meta.modified = ascii_value(&entry),
            TAG_MAKE => meta.make = ascii_value(&entry),
            TAG_MODEL => meta.model = ascii_value(&entry),
            TAG_SOFTWARE => meta.software = ascii_value(&entry),
            TAG_DESCRIPTION => meta.description = ascii_value(&entry),
            TAG_ORIENTATION => meta.orientation = short_value(&entry, little_endian),
            TAG_EXIF_IFD => exif_ifd = long_value(&entry, little_endian).map(|v| v as usize),
            TAG_GPS_IFD => gps_ifd = long_value(&entry, little_endian).map(|v| v as usize),
            _ => {} // self-describing, safely skipped
        }
    })?;

    if let Some(offset) = exif_ifd {
        walk_ifd(&reader, offset, |entry| match entry.tag {
            TAG_DATETIME_ORIGINAL => meta.capture = ascii_value(&entry),
            TAG_DATETIME_DIGITIZED => meta.digitized = ascii_value(&entry),
            _ => {}
        })?;
    }

    if let Some(offset) = gps_ifd {
        let mut lat_ref: Option<char> = None;
        let mut lon_ref: Option<char> = None;
        let mut lat: Option<f64> = None;
        let mut lon: Option<f64> = None;
        let mut alt_below = false;
        let mut alt: Option<f64> = None;

        walk_ifd(&reader, offset, |entry| match entry.tag {
            TAG_GPS_LAT_REF => lat_ref = ascii_value(&entry).and_then(|s| s.chars().next()),
            TAG_GPS_LON_REF => lon_ref = ascii_value(&entry).and_then(|s| s.chars().next()),
            TAG_GPS_LAT => lat = dms_value(&entry, little_endian),
            TAG_GPS_LON => lon = dms_value(&entry, little_endian),
            TAG_GPS_ALT_REF => alt_below = entry.value.first().copied() == Some(1),
            TAG_GPS_ALT => alt = rational_value(entry.value, 0, little_endian),
            _ => {}
        })?;

        if let (Some(lat), Some(lon)) = (lat, lon) {
            let lat = if lat_ref == Some('S') { -lat } else { lat };
            let lon = if lon_ref == Some('W') { -lon } else { lon };
            let altitude_m = alt.map(|a| if alt_below { -a } else { a });
            meta.gps = Some(GpsFix { lat, lon, altitude_m });
        }
    }

    Ok(meta)
}

/// Walk one flat directory, handing each well-formed entry to `visit`.
/// Structural reads (entry count, the 12 bytes of each entry, out-of-line
/// values) are all bounds-checked and fatal on overrun; an entry with an
/// unknown field type is skipped since its 12 bytes are still fixed-size.
fn walk_ifd<'a, F>(reader: &Reader<'a>, offset: usize, mut visit: F) -> Result<(), FatalError>
where
    F: FnMut(Entry<'a>),
{
    let count = reader.u16_at(offset)? as usize;
    for i in 0..count {
        let base = offset + 2 + i * 12;
        let tag = reader.u16_at(base)?;
        let field_type = reader.u16_at(base + 2)?;
        let value_count = reader.u32_at(base + 4)?;
        let Some(unit) = type_size(field_type) else {
            continue;
        };
        let total = unit.checked_mul(value_count as usize).ok_or_else(|| {
            FatalError::Invariant {
                item: reader.item.to_string(),
                message: format!("entry 0x{:04X} value size overflows", tag),
            }
        })?;
        let value = if total <= 4 {
            reader.slice(base + 8, total)?
        } else {
            let out_of_line = reader.u32_at(base + 8)? as usize;
            reader.slice(out_of_line, total)?
        };
        visit(Entry { tag, field_type, count: value_count, value });
    }
    Ok(())
}

/// ASCII value with the trailing NUL and padding stripped.
fn ascii_value(entry: &Entry<'_>) -> Option<String> {
    if entry.field_type != 2 {
        return None;
    }
    let text: String = entry
        .value
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| *b as char)
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn short_value(entry: &Entry<'_>, little_endian: bool) -> Option<u16> {
    if entry.field_type != 3 || entry.value.len() < 2 {
        return None;
    }
    let b = [entry.value[0], entry.value[1]];
    Some(if little_endian { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) })
}

fn long_value(entry: &Entry<'_>, little_endian: bool) -> Option<u32> {
    if entry.field_type != 4 || entry.value.len() < 4 {
        return None;
    }
    let b = [entry.value[0], entry.value[1], entry.value[2], entry.value[3]];
    Some(if little_endian { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
}

/// One rational (numerator/denominator u32 pair) at `index` within a value
/// buffer. Zero denominators are rejected, not divided.
fn rational_value(value: &[u8], index: usize, little_endian: bool) -> Option<f64> {
    let base = index * 8;
    let chunk = value.get(base..base + 8)?;
    let read = |b: &[u8]| {
        let arr = [b[0], b[1], b[2], b[3]];
        if little_endian { u32::from_le_bytes(arr) } else { u32::from_be_bytes(arr) }
    };
    let numerator = read(&chunk[0..4]);
    let denominator = read(&chunk[4..8]);
    if denominator == 0 {
        return None;
    }
    Some(numerator as f64 / denominator as f64)
}

/// Degree/minute/second triplet folded into decimal degrees.
fn dms_value(entry: &Entry<'_>, little_endian: bool) -> Option<f64> {
    if entry.field_type != 5 || entry.count < 3 {
        return None;
    }
    let degrees = rational_value(entry.value, 0, little_endian)?;
    let minutes = rational_value(entry.value, 1, little_endian)?;
    let seconds = rational_value(entry.value, 2, little_endian)?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}
