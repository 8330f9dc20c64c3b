//! Render payloads for the interaction surface
//!
//! The gateway adapter turns these into the platform's embeds and buttons.

use serde::{Deserialize, Serialize};

pub const COLOR_INFO: u32 = 0x00_aa_ff;
pub const COLOR_SUCCESS: u32 = 0x00_ff_00;
pub const COLOR_ERROR: u32 = 0xff_00_00;
pub const COLOR_WARN: u32 = 0xff_aa_00;
pub const COLOR_PREMIUM: u32 = 0xff_d7_00;
pub const COLOR_FACTION: u32 = 0x00_ff_ff;

/// Answer to any unexpected failure
pub const GENERIC_ERROR: &str = "An error occurred. Try again later.";

/// Appended to a view that can no longer be interacted with
pub const TIMED_OUT_NOTICE: &str = "**Interaction timed out.**";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Success,
    Danger,
}

/// A button the surface should render. `action` is echoed back on press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub action: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(action: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            action: action.into(),
            label: label.into(),
            style,
            disabled: false,
        }
    }

    pub fn disabled_if(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Embed-like structured display
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct View {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl View {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    /// Disable every button, keeping them visible
    pub fn disable_buttons(mut self) -> Self {
        for button in &mut self.buttons {
            button.disabled = true;
        }
        self
    }

    /// Same content, timed-out notice appended, nothing clickable
    pub fn timed_out(mut self) -> Self {
        self.description.push_str("\n\n");
        self.description.push_str(TIMED_OUT_NOTICE);
        self.disable_buttons()
    }
}

/// What a command or button press answers with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text message
    Text { content: String, ephemeral: bool },
    /// New embed message, optionally bound to an interactive session
    Embed {
        view: View,
        ephemeral: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Edit the message the pressed button belongs to
    Update { view: View },
    /// Acknowledge without changing anything
    Deferred,
}

impl Reply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Reply::Text {
            content: content.into(),
            ephemeral: true,
        }
    }

    pub fn embed(view: View) -> Self {
        Reply::Embed {
            view,
            ephemeral: false,
            session_id: None,
        }
    }

    pub fn ephemeral_embed(view: View) -> Self {
        Reply::Embed {
            view,
            ephemeral: true,
            session_id: None,
        }
    }

    pub fn session(view: View, session_id: impl Into<String>) -> Self {
        Reply::Embed {
            view,
            ephemeral: false,
            session_id: Some(session_id.into()),
        }
    }
}

/// Uppercase the first character, as resource names are shown
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
