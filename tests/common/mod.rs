//! Shared test utilities for integration tests
#![allow(dead_code)]

use lifeweave::models::ImportItem;

/// A small but structurally complete calendar export.
pub fn calendar_text(events: &[(&str, &str)]) -> String {
    let mut out = String::from("BEGIN:VCALENDAR\nVERSION:2.0\n");
    for (summary, dtstart) in events {
        out.push_str(&format!(
            "BEGIN:VEVENT\nSUMMARY:{}\nDTSTART:{}\nEND:VEVENT\n",
            summary, dtstart
        ));
    }
    out.push_str("END:VCALENDAR\n");
    out
}

/// A CSV item with the standard Title/Date/Notes header.
pub fn csv_item(name: &str, rows: &[(&str, &str, &str)]) -> ImportItem {
    let mut text = String::from("Title,Date,Notes\n");
    for (title, date, notes) in rows {
        text.push_str(&format!("{},{},{}\n", title, date, notes));
    }
    ImportItem::text(name, text)
}

/// Minimal JPEG wrapping a little-endian metadata container that carries a
/// single original-capture timestamp.
pub fn jpeg_with_capture_time(datetime: &str) -> Vec<u8> {
    // TIFF body: header, IFD0 with one sub-directory pointer, sub
    // directory with one ASCII entry, then the string data.
    let ascii_bytes = {
        let mut v = datetime.as_bytes().to_vec();
        v.push(0);
        v
    };

    let header_len = 8u32;
    let ifd0_len = 2 + 12 + 4; // one entry (sub-directory pointer)
    let exif_ifd_offset = header_len + ifd0_len as u32;
    let exif_ifd_len = 2 + 12 + 4;
    let data_offset = exif_ifd_offset + exif_ifd_len as u32;

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&header_len.to_le_bytes());

    // IFD0: pointer to the sub directory (tag 0x8769, LONG)
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x8769u16.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&exif_ifd_offset.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    // Sub directory: original capture time (tag 0x9003, ASCII, out of line)
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x9003u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(ascii_bytes.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&data_offset.to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&ascii_bytes);

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let payload_len = 6 + tiff.len() + 2;
    out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// A JPEG whose metadata container declares more bytes than the buffer
/// holds.
pub fn jpeg_with_lying_segment() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE1, 0xFF, 0xFF, 0x00, 0x00]
}
