//! Outbound FIX message assembly.
//!
//! A message is an ordered list of `tag=value` fields. The encoder owns
//! header ordering and length/checksum arithmetic; this type only records
//! what to say.

/// FIX field separator.
pub const SOH: u8 = 0x01;

/// Tags the encoder hoists to the front of the body, in this order.
pub const HEADER_TAGS: [u32; 5] = [35, 49, 56, 34, 52];

/// An outbound message body: ordered `(tag, value)` pairs.
///
/// Repeated tags are legal (repeating groups keep one field per entry),
/// so [`push`](Self::push) appends unconditionally while
/// [`set`](Self::set) replaces the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct FixMessage {
    fields: Vec<(u32, String)>,
}

impl FixMessage {
    /// Start a message of the given type (tag 35).
    pub fn new(msg_type: &str) -> Self {
        let mut msg = Self::default();
        msg.push(35, msg_type);
        msg
    }

    /// Append a field, keeping duplicates.
    pub fn push(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.fields.push((tag, value.into()));
        self
    }

    /// Replace the first occurrence of `tag`, or append if absent.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(field) => field.1 = value,
            None => self.fields.push((tag, value)),
        }
        self
    }

    /// First value for `tag`, if any.
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.get(35)
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> &[(u32, String)] {
        &self.fields
    }
}

/// Human label for a FIX message type code. Unknown codes keep the code
/// visible in logs.
pub fn type_label(code: &str) -> String {
    match code {
        "0" => "Heartbeat".to_string(),
        "1" => "Test Request".to_string(),
        "2" => "Resend Request".to_string(),
        "3" => "Reject".to_string(),
        "4" => "Sequence Reset".to_string(),
        "5" => "Logout".to_string(),
        "A" => "Logon".to_string(),
        "V" => "Market Data Request".to_string(),
        "W" => "Market Data Snapshot".to_string(),
        "X" => "Market Data Incremental Refresh".to_string(),
        other => format!("Unknown ({})", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_duplicates() {
        let mut msg = FixMessage::new("V");
        msg.push(269, "0").push(269, "1");

        let entry_types: Vec<&str> = msg
            .fields()
            .iter()
            .filter(|(t, _)| *t == 269)
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(entry_types, vec!["0", "1"]);
    }

    #[test]
    fn test_set_replaces_first() {
        let mut msg = FixMessage::new("A");
        msg.set(34, "1");
        msg.set(34, "2");
        assert_eq!(msg.get(34), Some("2"));
        assert_eq!(
            msg.fields().iter().filter(|(t, _)| *t == 34).count(),
            1
        );
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(type_label("A"), "Logon");
        assert_eq!(type_label("W"), "Market Data Snapshot");
        assert_eq!(type_label("q"), "Unknown (q)");
    }
}
