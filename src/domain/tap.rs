use serde::Serialize;

pub const NFC_UNSUPPORTED_REASON: &str = "NFC is not supported on this device";
pub const NFC_DISABLED_REASON: &str = "Please enable NFC on your device";
pub const NFC_READ_ERROR_REASON: &str = "Error reading NFC device";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Text,
    Url,
    Mime,
    Empty,
    Unknown,
}

/// A single record of a tapped NDEF message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    pub record_type: RecordType,
    pub data: Vec<u8>,
}

impl NdefRecord {
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::Text,
            data: payload.into().into_bytes(),
        }
    }

    pub fn new(record_type: RecordType, data: Vec<u8>) -> Self {
        Self { record_type, data }
    }

    /// Decodes a text record as UTF-8, replacing invalid sequences with
    /// U+FFFD. Non-text records yield `None`.
    pub fn decode_text(&self) -> Option<String> {
        if self.record_type != RecordType::Text {
            return None;
        }
        Some(String::from_utf8_lossy(&self.data).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NdefMessage {
    pub records: Vec<NdefRecord>,
}

impl NdefMessage {
    pub fn new(records: Vec<NdefRecord>) -> Self {
        Self { records }
    }
}

/// Events delivered by an enabled tap reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapEvent {
    Read(NdefMessage),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TapSupport {
    Unsupported,
    Disabled,
    Enabled,
}

/// What the session tells the user about tap-to-pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapCapabilityStatus {
    pub support: TapSupport,
    pub reason: Option<String>,
}

impl TapCapabilityStatus {
    pub fn is_enabled(&self) -> bool {
        self.support == TapSupport::Enabled
    }
}
