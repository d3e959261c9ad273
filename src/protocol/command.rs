use crate::{Error, Result};
use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Value};
use crate::protocol::constants::{command_names, status_codes};
use log::debug;

/// A command invocation as it appears on the wire:
/// `name, transaction id, command object, arguments...`
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpCommand {
    pub name: String,
    pub transaction_id: f64,
    pub command_object: Amf0Value,
    pub arguments: Vec<Amf0Value>,
}

/// Arguments of the `connect` command object
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    pub app: String,
    pub flash_ver: String,
    pub swf_url: String,
    pub tc_url: String,
}

impl RtmpCommand {
    pub fn new(name: impl Into<String>, transaction_id: f64) -> Self {
        RtmpCommand {
            name: name.into(),
            transaction_id,
            command_object: Amf0Value::Null,
            arguments: Vec::new(),
        }
    }

    pub fn connect(transaction_id: f64, params: &ConnectParams) -> Self {
        let mut cmd = RtmpCommand::new(command_names::CONNECT, transaction_id);
        cmd.command_object = Amf0Value::object([
            ("app", Amf0Value::string(&params.app)),
            ("type", Amf0Value::from("nonprivate")),
            ("flashVer", Amf0Value::string(&params.flash_ver)),
            ("swfUrl", Amf0Value::string(&params.swf_url)),
            ("tcUrl", Amf0Value::string(&params.tc_url)),
        ]);
        cmd
    }

    pub fn create_stream(transaction_id: f64) -> Self {
        RtmpCommand::new(command_names::CREATE_STREAM, transaction_id)
    }

    pub fn publish(transaction_id: f64, stream_path: &str, publish_type: &str) -> Self {
        let mut cmd = RtmpCommand::new(command_names::PUBLISH, transaction_id);
        cmd.arguments.push(Amf0Value::string(stream_path));
        cmd.arguments.push(Amf0Value::string(publish_type));
        cmd
    }

    /// `play` with start -2 (live, falling back to recorded) and no duration limit
    pub fn play(transaction_id: f64, stream_name: &str) -> Self {
        let mut cmd = RtmpCommand::new(command_names::PLAY, transaction_id);
        cmd.arguments.push(Amf0Value::string(stream_name));
        cmd.arguments.push(Amf0Value::Number(-2.0));
        cmd.arguments.push(Amf0Value::Number(-1.0));
        cmd
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::string(&self.name))?;
        encoder.encode(&Amf0Value::Number(self.transaction_id))?;
        encoder.encode(&self.command_object)?;
        for arg in &self.arguments {
            encoder.encode(arg)?;
        }
        Ok(encoder.into_bytes())
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Amf0Decoder::new(data);
        let name = decode_name(&mut decoder)?;
        let transaction_id = decode_transaction_id(&mut decoder)?;
        let mut values = decoder.decode_all()?;
        let command_object = if values.is_empty() { Amf0Value::Null } else { values.remove(0) };

        Ok(RtmpCommand {
            name,
            transaction_id,
            command_object,
            arguments: values,
        })
    }
}

fn decode_name(decoder: &mut Amf0Decoder<'_>) -> Result<String> {
    match decoder.decode()? {
        Amf0Value::String(s) | Amf0Value::LongString(s) => Ok(s),
        other => Err(Error::amf_decode(format!("Command name must be string, got {:?}", other))),
    }
}

fn decode_transaction_id(decoder: &mut Amf0Decoder<'_>) -> Result<f64> {
    if !decoder.has_remaining() {
        return Ok(0.0);
    }
    decoder.decode()?
        .as_number()
        .ok_or_else(|| Error::amf_decode("Transaction ID must be number"))
}

/// Commands outside the client vocabulary never fail the session.
///
/// Whatever decodes cleanly is kept; a non-numeric second value means there
/// is no transaction id, so it stays with the arguments.
fn decode_unknown(name: String, decoder: &mut Amf0Decoder<'_>) -> RtmpCommand {
    let mut values = Vec::new();
    while decoder.has_remaining() {
        match decoder.decode() {
            Ok(value) => values.push(value),
            Err(e) => {
                debug!("Dropping undecodable tail of '{}': {}", name, e);
                break;
            }
        }
    }

    let transaction_id = match values.first().and_then(Amf0Value::as_number) {
        Some(tx) => {
            values.remove(0);
            tx
        }
        None => 0.0,
    };
    let command_object = if values.is_empty() { Amf0Value::Null } else { values.remove(0) };
    RtmpCommand {
        name,
        transaction_id,
        command_object,
        arguments: values,
    }
}

/// The `level`/`code`/`description` triple servers attach to results and
/// `onStatus` notifications.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusInfo {
    pub level: String,
    pub code: String,
    pub description: String,
}

impl StatusInfo {
    pub fn new(level: &str, code: &str, description: &str) -> Self {
        StatusInfo {
            level: level.to_string(),
            code: code.to_string(),
            description: description.to_string(),
        }
    }

    pub fn from_value(value: &Amf0Value) -> Option<Self> {
        let code = value.get_str("code")?;
        Some(StatusInfo {
            level: value.get_str("level").unwrap_or_default().to_string(),
            code: code.to_string(),
            description: value.get_str("description").unwrap_or_default().to_string(),
        })
    }

    /// Last object carrying a `code` field; connect results put the
    /// information object after the server properties.
    pub fn find(values: &[Amf0Value]) -> Option<Self> {
        values.iter().rev().find_map(StatusInfo::from_value)
    }

    pub fn is_error(&self) -> bool {
        self.level == status_codes::LEVEL_ERROR
    }

    pub fn to_value(&self) -> Amf0Value {
        Amf0Value::object([
            ("level", Amf0Value::string(&self.level)),
            ("code", Amf0Value::string(&self.code)),
            ("description", Amf0Value::string(&self.description)),
        ])
    }
}

/// Commands a client can receive, discriminated by name and payload shape.
///
/// Session phases match on the variants legal for their state and ignore
/// the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCommand {
    /// `_result` whose payload is a number: reply to `createStream`
    StreamCreated { transaction_id: f64, stream_id: u32 },

    /// Any other `_result`
    Result {
        transaction_id: f64,
        properties: Amf0Value,
        status: Option<StatusInfo>,
    },

    /// `_error`
    Error {
        transaction_id: f64,
        status: Option<StatusInfo>,
    },

    /// `onStatus`
    OnStatus { status: StatusInfo },

    /// Anything else, raw values preserved
    Unknown(RtmpCommand),
}

impl ServerCommand {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Amf0Decoder::new(data);
        let name = decode_name(&mut decoder)?;
        if !matches!(
            name.as_str(),
            command_names::RESULT | command_names::ERROR | command_names::ON_STATUS
        ) {
            return Ok(ServerCommand::Unknown(decode_unknown(name, &mut decoder)));
        }

        let transaction_id = decode_transaction_id(&mut decoder)?;
        let values = decoder.decode_all()?;

        Ok(match name.as_str() {
            command_names::RESULT => {
                let stream_id = values.iter()
                    .find(|v| !v.is_null())
                    .and_then(|v| v.as_number());
                match stream_id {
                    Some(id) => ServerCommand::StreamCreated {
                        transaction_id,
                        stream_id: id as u32,
                    },
                    None => ServerCommand::Result {
                        transaction_id,
                        properties: values.first().cloned().unwrap_or(Amf0Value::Null),
                        status: StatusInfo::find(&values),
                    },
                }
            }
            command_names::ERROR => ServerCommand::Error {
                transaction_id,
                status: StatusInfo::find(&values),
            },
            _ => ServerCommand::OnStatus {
                status: StatusInfo::find(&values).unwrap_or_default(),
            },
        })
    }

    pub fn name(&self) -> &str {
        match self {
            ServerCommand::StreamCreated { .. } | ServerCommand::Result { .. } => command_names::RESULT,
            ServerCommand::Error { .. } => command_names::ERROR,
            ServerCommand::OnStatus { .. } => command_names::ON_STATUS,
            ServerCommand::Unknown(cmd) => &cmd.name,
        }
    }

    /// Status carried by results, errors and notifications
    pub fn status(&self) -> Option<&StatusInfo> {
        match self {
            ServerCommand::Result { status, .. } | ServerCommand::Error { status, .. } => status.as_ref(),
            ServerCommand::OnStatus { status } => Some(status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(name: &str, tid: f64, values: Vec<Amf0Value>) -> Vec<u8> {
        let mut cmd = RtmpCommand::new(name, tid);
        let mut values = values;
        if !values.is_empty() {
            cmd.command_object = values.remove(0);
        }
        cmd.arguments = values;
        cmd.encode().unwrap()
    }

    #[test]
    fn test_connect_command() {
        let params = ConnectParams {
            app: "live".into(),
            flash_ver: "FMLE/3.0".into(),
            swf_url: "rtmp://localhost/live/stream".into(),
            tc_url: "rtmp://localhost/live".into(),
        };
        let cmd = RtmpCommand::connect(1.0, &params);
        let decoded = RtmpCommand::decode(&cmd.encode().unwrap()).unwrap();

        assert_eq!(decoded.name, "connect");
        assert_eq!(decoded.transaction_id, 1.0);
        assert_eq!(decoded.command_object.get_str("app"), Some("live"));
        assert_eq!(decoded.command_object.get_str("tcUrl"), Some("rtmp://localhost/live"));
        assert_eq!(decoded.command_object.get_str("swfUrl"), Some("rtmp://localhost/live/stream"));
    }

    #[test]
    fn test_publish_arguments() {
        let cmd = RtmpCommand::publish(0.0, "inst?x=1", "live");
        let decoded = RtmpCommand::decode(&cmd.encode().unwrap()).unwrap();
        assert!(decoded.command_object.is_null());
        assert_eq!(decoded.arguments[0].as_str(), Some("inst?x=1"));
        assert_eq!(decoded.arguments[1].as_str(), Some("live"));
    }

    #[test]
    fn test_decode_stream_created() {
        let bytes = encode("_result", 2.0, vec![Amf0Value::Null, Amf0Value::Number(5.0)]);
        assert_eq!(
            ServerCommand::decode(&bytes).unwrap(),
            ServerCommand::StreamCreated { transaction_id: 2.0, stream_id: 5 }
        );
    }

    #[test]
    fn test_decode_connect_result_status() {
        let props = Amf0Value::object([("fmsVer", Amf0Value::from("FMS/3,0,1,123"))]);
        let info = StatusInfo::new("status", status_codes::CONNECT_SUCCESS, "Connection succeeded.");
        let bytes = encode("_result", 1.0, vec![props.clone(), info.to_value()]);

        match ServerCommand::decode(&bytes).unwrap() {
            ServerCommand::Result { transaction_id, properties, status } => {
                assert_eq!(transaction_id, 1.0);
                assert_eq!(properties, props);
                assert_eq!(status, Some(info));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_on_status() {
        let info = StatusInfo::new("error", "NetStream.Publish.BadName", "Already publishing");
        let bytes = encode("onStatus", 0.0, vec![Amf0Value::Null, info.to_value()]);
        let cmd = ServerCommand::decode(&bytes).unwrap();
        assert_eq!(cmd.name(), "onStatus");
        assert_eq!(cmd.status(), Some(&info));
        assert!(cmd.status().unwrap().is_error());
    }

    #[test]
    fn test_unknown_command_is_preserved() {
        let bytes = encode("onBWDone", 0.0, vec![Amf0Value::Null, Amf0Value::Number(8192.0)]);
        match ServerCommand::decode(&bytes).unwrap() {
            ServerCommand::Unknown(cmd) => {
                assert_eq!(cmd.name, "onBWDone");
                assert_eq!(cmd.arguments, vec![Amf0Value::Number(8192.0)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_with_garbage_arguments() {
        let mut bytes = encode("onFutureThing", 3.0, vec![]);
        bytes.extend_from_slice(&[0x11, 0x0A, 0x0B]);
        match ServerCommand::decode(&bytes).unwrap() {
            ServerCommand::Unknown(cmd) => {
                assert_eq!(cmd.name, "onFutureThing");
                assert_eq!(cmd.transaction_id, 3.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_without_transaction_id() {
        let bytes = Amf0Encoder::encode_all(&[
            Amf0Value::from("onFutureThing"),
            Amf0Value::from("x"),
        ])
        .unwrap();
        match ServerCommand::decode(&bytes).unwrap() {
            ServerCommand::Unknown(cmd) => {
                assert_eq!(cmd.name, "onFutureThing");
                assert_eq!(cmd.transaction_id, 0.0);
                assert_eq!(cmd.command_object, Amf0Value::from("x"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_known_command_still_requires_transaction_id() {
        let bytes = Amf0Encoder::encode_all(&[
            Amf0Value::from("_result"),
            Amf0Value::from("x"),
        ])
        .unwrap();
        assert!(ServerCommand::decode(&bytes).is_err());
    }

    #[test]
    fn test_non_string_name_fails() {
        let bytes = Amf0Encoder::encode_all(&[Amf0Value::Number(1.0)]).unwrap();
        assert!(ServerCommand::decode(&bytes).is_err());
    }
}
