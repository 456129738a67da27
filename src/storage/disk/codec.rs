//! Page file format.
//!
//! ```text
//! magic "SPG1" | version u16 | row count u32 | rows...
//! row:   position u32 | entry count u16 | entries...
//! entry: tag u8 | payload
//! ```
//!
//! Tags are 0 Null, 1 Int, 2 Long, 3 Float, 4 Double, 5 String. Integers are
//! little-endian; strings are a u32 byte length followed by UTF-8.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::{PageId, Result, StrataError, PAGE_FORMAT_MAGIC, PAGE_FORMAT_VERSION};
use crate::tuple::{Entry, Row};

const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_LONG: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_STRING: u8 = 5;

const HEADER_SIZE: usize = 4 + 2 + 4;

/// Encodes rows into a page file image.
///
/// Rows with more entries than a `u16` holds, and strings longer than a
/// `u32` holds, cannot be represented and fail with `CorruptPage`.
pub fn encode_rows<'a, I>(rows: I) -> Result<Bytes>
where
    I: IntoIterator<Item = &'a Row>,
{
    let rows: Vec<&Row> = rows.into_iter().collect();
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + rows.len() * 32);

    buf.put_slice(&PAGE_FORMAT_MAGIC);
    buf.put_u16_le(PAGE_FORMAT_VERSION);
    buf.put_u32_le(encoded_len(rows.len(), "row count")?);

    for row in rows {
        let entry_count = u16::try_from(row.len()).map_err(|_| {
            StrataError::CorruptPage(format!("row with {} entries is too wide", row.len()))
        })?;
        buf.put_u32_le(row.position().as_u32());
        buf.put_u16_le(entry_count);
        for entry in row.entries() {
            encode_entry(&mut buf, entry)?;
        }
    }

    Ok(buf.freeze())
}

fn encoded_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| StrataError::CorruptPage(format!("{} {} is too large", what, len)))
}

fn encode_entry(buf: &mut BytesMut, entry: &Entry) -> Result<()> {
    match entry {
        Entry::Null => buf.put_u8(TAG_NULL),
        Entry::Int(v) => {
            buf.put_u8(TAG_INT);
            buf.put_i32_le(*v);
        }
        Entry::Long(v) => {
            buf.put_u8(TAG_LONG);
            buf.put_i64_le(*v);
        }
        Entry::Float(v) => {
            buf.put_u8(TAG_FLOAT);
            buf.put_f32_le(*v);
        }
        Entry::Double(v) => {
            buf.put_u8(TAG_DOUBLE);
            buf.put_f64_le(*v);
        }
        Entry::String(s) => {
            buf.put_u8(TAG_STRING);
            buf.put_u32_le(encoded_len(s.len(), "string length")?);
            buf.put_slice(s.as_bytes());
        }
    }
    Ok(())
}

/// Decodes a page file image. Truncated or foreign data fails with
/// `CorruptPage`.
pub fn decode_rows(data: &[u8]) -> Result<Vec<Row>> {
    let mut buf = data;

    ensure(&buf, HEADER_SIZE, "header")?;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if magic != PAGE_FORMAT_MAGIC {
        return Err(StrataError::CorruptPage("bad magic".to_string()));
    }
    let version = buf.get_u16_le();
    if version != PAGE_FORMAT_VERSION {
        return Err(StrataError::CorruptPage(format!(
            "unsupported version {}",
            version
        )));
    }

    let row_count = buf.get_u32_le() as usize;
    let mut rows = Vec::with_capacity(row_count.min(1024));
    for _ in 0..row_count {
        ensure(&buf, 6, "row header")?;
        let position = PageId::new(buf.get_u32_le());
        let entry_count = buf.get_u16_le() as usize;

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            entries.push(decode_entry(&mut buf)?);
        }
        rows.push(Row::with_position(entries, position));
    }

    if buf.has_remaining() {
        return Err(StrataError::CorruptPage(format!(
            "{} trailing bytes",
            buf.remaining()
        )));
    }
    Ok(rows)
}

fn decode_entry(buf: &mut &[u8]) -> Result<Entry> {
    ensure(buf, 1, "entry tag")?;
    let entry = match buf.get_u8() {
        TAG_NULL => Entry::Null,
        TAG_INT => {
            ensure(buf, 4, "int")?;
            Entry::Int(buf.get_i32_le())
        }
        TAG_LONG => {
            ensure(buf, 8, "long")?;
            Entry::Long(buf.get_i64_le())
        }
        TAG_FLOAT => {
            ensure(buf, 4, "float")?;
            Entry::Float(buf.get_f32_le())
        }
        TAG_DOUBLE => {
            ensure(buf, 8, "double")?;
            Entry::Double(buf.get_f64_le())
        }
        TAG_STRING => {
            ensure(buf, 4, "string length")?;
            let len = buf.get_u32_le() as usize;
            ensure(buf, len, "string")?;
            let text = std::str::from_utf8(&buf[..len])
                .map_err(|e| StrataError::CorruptPage(format!("invalid utf-8: {}", e)))?
                .to_string();
            buf.advance(len);
            Entry::String(text)
        }
        tag => return Err(StrataError::CorruptPage(format!("unknown entry tag {}", tag))),
    };
    Ok(entry)
}

fn ensure(buf: &&[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(StrataError::CorruptPage(format!("truncated {}", what)));
    }
    Ok(())
}
