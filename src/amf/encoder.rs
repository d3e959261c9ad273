use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{BytesWriteExt, Error, Result};

pub struct Amf0Encoder {
    buffer: Vec<u8>,
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Encode a whole value sequence, as used by command and data messages
    pub fn encode_all(values: &[Amf0Value]) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        for value in values {
            encoder.encode(value)?;
        }
        Ok(encoder.into_bytes())
    }

    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        match value {
            Amf0Value::Number(n) => {
                self.buffer.put_u8(markers::NUMBER);
                self.buffer.put_f64_be(*n);
            }
            Amf0Value::Boolean(b) => {
                self.buffer.put_u8(markers::BOOLEAN);
                self.buffer.put_u8(*b as u8);
            }
            // Strings that do not fit a u16 length are promoted to long strings
            Amf0Value::String(s) if s.len() > u16::MAX as usize => self.encode_long_string(s),
            Amf0Value::String(s) => {
                self.buffer.put_u8(markers::STRING);
                self.write_short_utf8(s)?;
            }
            Amf0Value::Object(obj) => {
                self.buffer.put_u8(markers::OBJECT);
                self.write_properties(obj)?;
            }
            Amf0Value::Null => self.buffer.put_u8(markers::NULL),
            Amf0Value::Undefined => self.buffer.put_u8(markers::UNDEFINED),
            Amf0Value::EcmaArray(obj) => {
                self.buffer.put_u8(markers::ECMA_ARRAY);
                self.buffer.put_u32_be(obj.len() as u32);
                self.write_properties(obj)?;
            }
            Amf0Value::StrictArray(arr) => {
                self.buffer.put_u8(markers::STRICT_ARRAY);
                self.buffer.put_u32_be(arr.len() as u32);
                for item in arr {
                    self.encode(item)?;
                }
            }
            Amf0Value::Date(timestamp, timezone) => {
                self.buffer.put_u8(markers::DATE);
                self.buffer.put_f64_be(*timestamp);
                self.buffer.put_i16_be(*timezone);
            }
            Amf0Value::LongString(s) => self.encode_long_string(s),
            Amf0Value::Unsupported => self.buffer.put_u8(markers::UNSUPPORTED),
            Amf0Value::XmlDocument(xml) => {
                self.buffer.put_u8(markers::XML_DOCUMENT);
                self.write_long_utf8(xml);
            }
            Amf0Value::TypedObject(class_name, obj) => {
                self.buffer.put_u8(markers::TYPED_OBJECT);
                self.write_short_utf8(class_name)?;
                self.write_properties(obj)?;
            }
        }
        Ok(())
    }

    fn encode_long_string(&mut self, value: &str) {
        self.buffer.put_u8(markers::LONG_STRING);
        self.write_long_utf8(value);
    }

    /// u16 length prefix, no type marker (object keys, class names)
    fn write_short_utf8(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| Error::amf_encode(format!("String of {} bytes exceeds u16 length", value.len())))?;
        self.buffer.put_u16_be(len);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn write_long_utf8(&mut self, value: &str) {
        self.buffer.put_u32_be(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    fn write_properties(&mut self, obj: &Amf0Object) -> Result<()> {
        for (key, value) in obj {
            if key.is_empty() {
                return Err(Error::amf_encode("Empty property name collides with object end"));
            }
            self.write_short_utf8(key)?;
            self.encode(value)?;
        }
        self.buffer.put_u16_be(0);
        self.buffer.put_u8(markers::OBJECT_END);
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Amf0Encoder::new()
    }
}
