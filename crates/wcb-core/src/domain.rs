/// WhatsApp sender identity (e.g. `919999888777@c.us` or a Cloud API wa_id).
///
/// Opaque to the core: it only needs equality and hashing to shard state
/// per conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vendor code, normalized to uppercase at construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VendorCode(String);

impl VendorCode {
    pub const DEFAULT: &'static str = "DEFAULT";

    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn default_code() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VendorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
