//! Sender address handling for list display.

use serde::Serialize;

/// A decoded `From:` value split into display name and address.
///
/// - `"张三 <zhang@example.com>"` → `display_name = "张三"`, `address = "zhang@example.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub display_name: String,
    pub address: String,
}

impl EmailAddress {
    /// Parse `Name <addr>`, `<addr>` or a bare value. Unrecognized input is
    /// kept whole as the address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let (Some(open), true) = (trimmed.rfind('<'), trimmed.ends_with('>')) {
            let address = trimmed[open + 1..trimmed.len() - 1].trim().to_string();
            let display_name = strip_quotes(&trimmed[..open]);
            return Self {
                display_name,
                address,
            };
        }

        Self {
            display_name: String::new(),
            address: trimmed.to_string(),
        }
    }

    /// The label shown in a message list: the name if there is one,
    /// otherwise the address.
    pub fn short(&self) -> &str {
        if self.display_name.is_empty() {
            &self.address
        } else {
            &self.display_name
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_empty() && self.address.is_empty()
    }
}

fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
