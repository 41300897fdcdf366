//! Manage category: terminal administration.
//!
//! Request body layout:
//!
//! ```text
//! 0 command          `A` + two-digit sub-type
//! 1 version
//! 2 variable name
//! 3 variable value
//! 4 title
//! 5 message lines    US-joined
//! 6 buttons          US-joined
//! 7 input min length
//! 8 input max length
//! 9 prompt timeout   seconds
//! ```

use crate::error::EncodeError;
use crate::ext::ExtView;
use crate::field::{BodyBuilder, FieldView};
use crate::message::Category;
use crate::symbol::ManageType;
use crate::WIRE_VERSION;

/// A staged administration request.
#[derive(Debug, Clone, Default)]
pub struct ManageRequest {
    pub kind: ManageType,
    pub variable_name: Option<String>,
    pub variable_value: Option<String>,
    /// Dialog or prompt title.
    pub title: Option<String>,
    /// Display lines, top to bottom.
    pub message_lines: Vec<String>,
    /// Dialog button labels, left to right.
    pub buttons: Vec<String>,
    pub input_min_len: Option<u32>,
    pub input_max_len: Option<u32>,
    /// Seconds the terminal keeps a prompt up before giving up.
    pub prompt_timeout: Option<u32>,
}

impl ManageRequest {
    pub fn new(kind: ManageType) -> Self {
        ManageRequest {
            kind,
            ..Default::default()
        }
    }

    pub fn init() -> Self {
        Self::new(ManageType::Init)
    }

    pub fn reset() -> Self {
        Self::new(ManageType::Reset)
    }

    pub fn reboot() -> Self {
        Self::new(ManageType::Reboot)
    }

    pub fn get_signature() -> Self {
        Self::new(ManageType::GetSignature)
    }

    pub fn clear_message() -> Self {
        Self::new(ManageType::ClearMessage)
    }

    pub fn show_thank_you() -> Self {
        Self::new(ManageType::ShowThankYou)
    }

    pub fn get_pin_block() -> Self {
        Self::new(ManageType::GetPinBlock)
    }

    pub fn show_message(lines: Vec<String>) -> Self {
        let mut r = Self::new(ManageType::ShowMessage);
        r.message_lines = lines;
        r
    }

    pub fn show_dialog(title: impl Into<String>, buttons: Vec<String>, timeout: u32) -> Self {
        let mut r = Self::new(ManageType::ShowDialog);
        r.title = Some(title.into());
        r.buttons = buttons;
        r.prompt_timeout = Some(timeout);
        r
    }

    pub fn input_text(title: impl Into<String>, min_len: u32, max_len: u32) -> Self {
        let mut r = Self::new(ManageType::InputText);
        r.title = Some(title.into());
        r.input_min_len = Some(min_len);
        r.input_max_len = Some(max_len);
        r
    }

    pub fn input_account(title: impl Into<String>) -> Self {
        let mut r = Self::new(ManageType::InputAccount);
        r.title = Some(title.into());
        r
    }

    pub fn set_variable(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut r = Self::new(ManageType::SetVariable);
        r.variable_name = Some(name.into());
        r.variable_value = Some(value.into());
        r
    }

    pub fn get_variable(name: impl Into<String>) -> Self {
        let mut r = Self::new(ManageType::GetVariable);
        r.variable_name = Some(name.into());
        r
    }

    /// Validates the request and encodes the wire body.
    pub fn encode(&self) -> Result<String, EncodeError> {
        if self.kind == ManageType::Unknown {
            return Err(EncodeError::TransType(self.kind.name()));
        }
        match self.kind {
            ManageType::SetVariable => {
                if self.variable_name.is_none() {
                    return Err(EncodeError::ForceValue {
                        trans: self.kind.name(),
                        field: "variable_name",
                    });
                }
                if self.variable_value.is_none() {
                    return Err(EncodeError::ForceValue {
                        trans: self.kind.name(),
                        field: "variable_value",
                    });
                }
            }
            ManageType::GetVariable if self.variable_name.is_none() => {
                return Err(EncodeError::ForceValue {
                    trans: self.kind.name(),
                    field: "variable_name",
                });
            }
            ManageType::ShowDialog if self.buttons.is_empty() => {
                return Err(EncodeError::ForceValue {
                    trans: self.kind.name(),
                    field: "buttons",
                });
            }
            _ => {}
        }
        if let (Some(min), Some(max)) = (self.input_min_len, self.input_max_len) {
            if min > max {
                return Err(EncodeError::ForceValue {
                    trans: self.kind.name(),
                    field: "input_max_len",
                });
            }
        }

        let mut b = BodyBuilder::new();
        b.push_raw(format!(
            "{}{}",
            Category::Manage.letter(),
            self.kind.wire_code()
        ));
        b.push_raw(WIRE_VERSION.to_string());
        b.push_opt("variable_name", self.variable_name.as_deref())?;
        b.push_opt("variable_value", self.variable_value.as_deref())?;
        b.push_opt("title", self.title.as_deref())?;
        b.push_lines("message_lines", &self.message_lines)?;
        b.push_lines("buttons", &self.buttons)?;
        b.push_opt(
            "input_min_len",
            self.input_min_len.map(|v| v.to_string()).as_deref(),
        )?;
        b.push_opt(
            "input_max_len",
            self.input_max_len.map(|v| v.to_string()).as_deref(),
        )?;
        b.push_opt(
            "prompt_timeout",
            self.prompt_timeout.map(|v| v.to_string()).as_deref(),
        )?;
        b.finish()
    }
}

/// Terminal reply to a manage request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManageResponse {
    pub result_code: String,
    pub result_text: String,
    pub serial_number: Option<String>,
    pub model_name: Option<String>,
    pub os_version: Option<String>,
    pub mac_address: Option<String>,
    pub lines_per_screen: Option<u32>,
    pub chars_per_line: Option<u32>,
    /// Values answering a variable query, in request order.
    pub variable_values: Vec<String>,
    /// Index of the dialog button pressed, leftmost is 1.
    pub button_number: Option<u32>,
    pub text_input: Option<String>,
    /// Captured signature bitmap; hex on the wire.
    pub signature_data: Option<Vec<u8>>,
    pub ext_data: ExtView,
}

impl ManageResponse {
    /// Decodes a reassembled body, leniently.
    pub fn decode(body: &str) -> Self {
        let v = FieldView::new(body);
        ManageResponse {
            result_code: v.get(0).unwrap_or("").to_string(),
            result_text: v.get(1).unwrap_or("").to_string(),
            serial_number: v.owned(2),
            model_name: v.owned(3),
            os_version: v.owned(4),
            mac_address: v.owned(5),
            lines_per_screen: v.number(6),
            chars_per_line: v.number(7),
            variable_values: v.sub(8).into_iter().map(str::to_string).collect(),
            button_number: v.number(9),
            text_input: v.owned(10),
            signature_data: v.non_empty(11).and_then(|h| hex::decode(h).ok()),
            ext_data: ExtView::parse(v.get(12).unwrap_or("")),
        }
    }
}
