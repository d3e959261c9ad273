use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{ByteReader, Error, Result};

/// Nesting limit for objects and arrays; deeper input is rejected rather than
/// risking the stack on hostile payloads.
const MAX_DEPTH: usize = 64;

pub struct Amf0Decoder<'a> {
    reader: ByteReader<'a>,
    depth: usize,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Amf0Decoder {
            reader: ByteReader::new(data),
            depth: 0,
        }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.reader.has_remaining()
    }

    /// Decode every value left in the payload
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>> {
        let mut values = Vec::new();
        while self.has_remaining() {
            values.push(self.decode()?);
        }
        Ok(values)
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        let marker = self.reader.read_u8()?;
        match marker {
            markers::NUMBER => Ok(Amf0Value::Number(self.reader.read_f64_be()?)),
            markers::BOOLEAN => Ok(Amf0Value::Boolean(self.reader.read_u8()? != 0)),
            markers::STRING => {
                let len = self.reader.read_u16_be()? as usize;
                Ok(Amf0Value::String(self.reader.read_utf8(len)?))
            }
            markers::OBJECT => Ok(Amf0Value::Object(self.decode_properties()?)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => {
                // Count is advisory; the terminator is authoritative
                let _count = self.reader.read_u32_be()?;
                Ok(Amf0Value::EcmaArray(self.decode_properties()?))
            }
            markers::STRICT_ARRAY => self.decode_strict_array(),
            markers::DATE => {
                let timestamp = self.reader.read_f64_be()?;
                let timezone = self.reader.read_i16_be()?;
                Ok(Amf0Value::Date(timestamp, timezone))
            }
            markers::LONG_STRING => {
                let len = self.reader.read_u32_be()? as usize;
                Ok(Amf0Value::LongString(self.reader.read_utf8(len)?))
            }
            markers::UNSUPPORTED => Ok(Amf0Value::Unsupported),
            markers::XML_DOCUMENT => {
                let len = self.reader.read_u32_be()? as usize;
                Ok(Amf0Value::XmlDocument(self.reader.read_utf8(len)?))
            }
            markers::TYPED_OBJECT => {
                let len = self.reader.read_u16_be()? as usize;
                let class_name = self.reader.read_utf8(len)?;
                Ok(Amf0Value::TypedObject(class_name, self.decode_properties()?))
            }
            markers::AVMPLUS_OBJECT => Err(Error::amf_decode("AMF3 values are not supported")),
            markers::MOVIE_CLIP | markers::REFERENCE | markers::RECORDSET => Err(Error::amf_decode(
                format!("Unsupported AMF0 marker: 0x{:02x}", marker),
            )),
            _ => Err(Error::amf_decode(format!("Unknown AMF0 marker: 0x{:02x}", marker))),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::amf_decode("AMF0 nesting too deep"));
        }
        Ok(())
    }

    /// Read `name, value` pairs up to the empty-name + OBJECT_END terminator
    fn decode_properties(&mut self) -> Result<Amf0Object> {
        self.enter()?;
        let mut object = Amf0Object::new();
        loop {
            let name_len = self.reader.read_u16_be()? as usize;
            if name_len == 0 {
                let end = self.reader.read_u8()?;
                if end != markers::OBJECT_END {
                    return Err(Error::amf_decode(format!(
                        "Expected object end marker, got 0x{:02x}",
                        end
                    )));
                }
                break;
            }
            let name = self.reader.read_utf8(name_len)?;
            let value = self.decode()?;
            object.insert(name, value);
        }
        self.depth -= 1;
        Ok(object)
    }

    fn decode_strict_array(&mut self) -> Result<Amf0Value> {
        self.enter()?;
        let count = self.reader.read_u32_be()? as usize;
        // Each element takes at least one byte, so never trust a count larger than the input
        let mut array = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            array.push(self.decode()?);
        }
        self.depth -= 1;
        Ok(Amf0Value::StrictArray(array))
    }
}
