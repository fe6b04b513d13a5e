use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    /// Template-based messenger notice; falls back to SMS when unavailable.
    Chat,
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: Option<String>,
    pub body: String,
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self { subject: None, body: body.into() }
    }

    pub fn email(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self { subject: Some(subject.into()), body: body.into() }
    }
}
