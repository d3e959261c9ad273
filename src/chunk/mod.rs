mod stream;
mod reader;
mod writer;

pub use stream::*;
pub use reader::*;
pub use writer::*;

use crate::{Error, Result, MAX_CHUNK_STREAM_ID};

/// Append the 1, 2 or 3 byte basic header for `cs_id`
pub fn encode_basic_header(fmt: u8, cs_id: u32, out: &mut Vec<u8>) -> Result<()> {
    match cs_id {
        2..=63 => out.push((fmt << 6) | cs_id as u8),
        64..=319 => {
            out.push(fmt << 6);
            out.push((cs_id - 64) as u8);
        }
        320..=MAX_CHUNK_STREAM_ID => {
            let id = cs_id - 64;
            out.push((fmt << 6) | 1);
            out.push((id & 0xFF) as u8);
            out.push((id >> 8) as u8);
        }
        _ => return Err(Error::chunk_format(format!("Chunk stream id {} cannot be encoded", cs_id))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header_forms() {
        let mut out = Vec::new();
        encode_basic_header(0, 3, &mut out).unwrap();
        assert_eq!(out, vec![0x03]);

        out.clear();
        encode_basic_header(3, 64, &mut out).unwrap();
        assert_eq!(out, vec![0xC0, 0x00]);

        out.clear();
        encode_basic_header(1, 320, &mut out).unwrap();
        assert_eq!(out, vec![0x41, 0x00, 0x01]);

        assert!(encode_basic_header(0, 1, &mut Vec::new()).is_err());
        assert!(encode_basic_header(0, 65600, &mut Vec::new()).is_err());
    }
}
