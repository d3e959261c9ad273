use crate::{Error, Result};
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};

/// AMF0 data message (`@setDataFrame`, `onMetaData`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpData {
    pub handler: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    /// Metadata as a publisher sends it: `@setDataFrame, "onMetaData", {...}`
    pub fn set_data_frame(metadata: Amf0Object) -> Self {
        RtmpData {
            handler: "@setDataFrame".to_string(),
            values: vec![Amf0Value::from("onMetaData"), Amf0Value::EcmaArray(metadata)],
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::string(&self.handler))?;
        for value in &self.values {
            encoder.encode(value)?;
        }
        Ok(encoder.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Amf0Decoder::new(data);
        let handler = decoder.decode()?
            .as_str()
            .ok_or_else(|| Error::amf_decode("Data handler must be string"))?
            .to_string();
        let values = decoder.decode_all()?;
        Ok(RtmpData { handler, values })
    }

    /// Metadata object, whether sent as `onMetaData` or wrapped in `@setDataFrame`
    pub fn metadata(&self) -> Option<&Amf0Object> {
        let values = match self.handler.as_str() {
            "onMetaData" => &self.values[..],
            "@setDataFrame" if self.values.first().and_then(|v| v.as_str()) == Some("onMetaData") => &self.values[1..],
            _ => return None,
        };
        values.first().and_then(|v| v.as_object())
    }
}
