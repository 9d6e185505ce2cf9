use regex::Regex;

use crate::domain::VendorCode;

/// Control commands embedded in message text.
///
/// These form a tiny wire-level sub-protocol on top of free text and must
/// be recognized before any description-append logic runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    /// Close and submit the current draft.
    Flush,
    /// Switch the sender's active vendor code.
    VendorSwitch(VendorCode),
    /// Discard any in-flight draft and start a fresh one.
    Start,
}

/// Configurable token set for the control grammar.
///
/// Defaults match the legacy bot: `✅` as flush marker, `vendor <CODE>`
/// (case-insensitive) as vendor switch, `!product` as explicit start.
#[derive(Clone, Debug)]
pub struct CommandGrammar {
    flush_marker: String,
    start_command: String,
    vendor_pattern: Regex,
}

impl Default for CommandGrammar {
    fn default() -> Self {
        Self::new("✅", "!product")
    }
}

impl CommandGrammar {
    pub fn new(flush_marker: &str, start_command: &str) -> Self {
        Self {
            flush_marker: flush_marker.to_string(),
            start_command: start_command.to_string(),
            // Code is the first whitespace-delimited word after "vendor".
            vendor_pattern: Regex::new(r"(?i)^vendor\s+(\S+)").expect("vendor pattern"),
        }
    }

    pub fn flush_marker(&self) -> &str {
        &self.flush_marker
    }

    /// Parse one inbound text body. Returns `None` when the text is plain
    /// description content.
    ///
    /// Precedence: vendor switch, then start command, then flush marker.
    /// The flush marker matches anywhere in the body; the other two must
    /// lead it. `vendor` with no code following is not a command.
    pub fn parse(&self, body: &str) -> Option<Control> {
        let body = body.trim();

        if let Some(caps) = self.vendor_pattern.captures(body) {
            return Some(Control::VendorSwitch(VendorCode::new(&caps[1])));
        }

        if body.eq_ignore_ascii_case(&self.start_command) {
            return Some(Control::Start);
        }

        if body.contains(&self.flush_marker) {
            return Some(Control::Flush);
        }

        None
    }
}
