// Embed builder draft - the editable state behind the `/embed` widget.
//
// The Discord layer renders a draft into a serenity embed and routes the
// widget's buttons and modals to these methods.

use thiserror::Error;

/// Discord allows at most 25 fields per embed.
pub const MAX_FIELDS: usize = 25;

pub const DEFAULT_TITLE: &str = "New embed";
pub const DEFAULT_DESCRIPTION: &str = "Use the buttons to edit it.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbedDraftError {
    #[error("An embed can hold at most {MAX_FIELDS} fields")]
    FieldLimit,

    #[error("This embed session is already closed")]
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedDraft {
    pub title: String,
    pub description: String,
    /// `None` renders with the default embed colour.
    pub colour: Option<u32>,
    pub fields: Vec<EmbedField>,
}

impl Default for EmbedDraft {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            colour: None,
            fields: Vec::new(),
        }
    }
}

impl EmbedDraft {
    /// Replace title, description and colour in one go, as the edit modal does.
    pub fn set_core(&mut self, title: &str, description: &str, colour_text: &str) {
        self.title = title.to_string();
        self.description = description.to_string();
        self.colour = parse_colour(colour_text);
    }

    pub fn add_field(
        &mut self,
        name: &str,
        value: &str,
        inline_text: &str,
    ) -> Result<(), EmbedDraftError> {
        if self.fields.len() >= MAX_FIELDS {
            return Err(EmbedDraftError::FieldLimit);
        }

        self.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline: parse_inline(inline_text),
        });
        Ok(())
    }
}

/// `#RGB` or `#RRGGBB`, read as a plain hex number (`#f80` is `0x000F80`).
/// Anything else, including surrounding whitespace, is `None`.
pub fn parse_colour(text: &str) -> Option<u32> {
    let hex = text.strip_prefix('#')?;
    if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

pub fn parse_inline(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "yes" | "y" | "true" | "t"
    )
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Sent,
    Cancelled,
    TimedOut,
}

/// One user's editing session. Once it leaves `Editing` it never changes again.
#[derive(Debug, Clone)]
pub struct EmbedBuilderSession {
    pub author_id: u64,
    draft: EmbedDraft,
    state: SessionState,
}

impl EmbedBuilderSession {
    pub fn new(author_id: u64) -> Self {
        Self {
            author_id,
            draft: EmbedDraft::default(),
            state: SessionState::Editing,
        }
    }

    pub fn draft(&self) -> &EmbedDraft {
        &self.draft
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn edit(&mut self) -> Result<&mut EmbedDraft, EmbedDraftError> {
        self.ensure_editing()?;
        Ok(&mut self.draft)
    }

    /// The draft to post. The session stays open until `send` confirms it,
    /// so a failed post can be retried.
    pub fn pending_send(&self) -> Result<EmbedDraft, EmbedDraftError> {
        self.ensure_editing()?;
        Ok(self.draft.clone())
    }

    /// Finish the session and hand out the draft to post.
    pub fn send(&mut self) -> Result<EmbedDraft, EmbedDraftError> {
        self.finish(SessionState::Sent)?;
        Ok(self.draft.clone())
    }

    pub fn cancel(&mut self) -> Result<(), EmbedDraftError> {
        self.finish(SessionState::Cancelled)
    }

    pub fn time_out(&mut self) -> Result<(), EmbedDraftError> {
        self.finish(SessionState::TimedOut)
    }

    fn ensure_editing(&self) -> Result<(), EmbedDraftError> {
        if self.state == SessionState::Editing {
            Ok(())
        } else {
            Err(EmbedDraftError::SessionClosed)
        }
    }

    fn finish(&mut self, next: SessionState) -> Result<(), EmbedDraftError> {
        self.ensure_editing()?;
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_draft_has_placeholder_text() {
        let draft = EmbedDraft::default();
        assert_eq!(draft.title, "New embed");
        assert_eq!(draft.description, "Use the buttons to edit it.");
        assert_eq!(draft.colour, None);
        assert!(draft.fields.is_empty());
    }

    #[test]
    fn colour_accepts_short_and_long_hex() {
        assert_eq!(parse_colour("#FF8800"), Some(0xFF8800));
        assert_eq!(parse_colour("#00ff00"), Some(0x00FF00));
    }

    #[test]
    fn short_hex_is_read_literally() {
        assert_eq!(parse_colour("#f80"), Some(0x000F80));
        assert_eq!(parse_colour("#FFF"), Some(0x000FFF));
    }

    #[test]
    fn colour_rejects_everything_else() {
        for bad in [
            "", " #00ff00 ", "FF8800", "#FF88", "#GGGGGG", "#+12345", "red", "#FF880000",
        ] {
            assert_eq!(parse_colour(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn invalid_colour_resets_to_default() {
        let mut draft = EmbedDraft::default();
        draft.set_core("Rules", "Be nice", "#123456");
        assert_eq!(draft.colour, Some(0x123456));

        draft.set_core("Rules", "Be nice", "blue");
        assert_eq!(draft.colour, None);
        assert_eq!(draft.title, "Rules");
    }

    #[test]
    fn inline_flag_parsing() {
        for yes in ["yes", "Y", "TRUE", "t"] {
            assert!(parse_inline(yes));
        }
        for no in ["no", "", "1", "inline", "false"] {
            assert!(!parse_inline(no));
        }
    }

    #[test]
    fn twenty_sixth_field_is_rejected() {
        let mut draft = EmbedDraft::default();
        for i in 0..MAX_FIELDS {
            draft.add_field(&format!("f{i}"), "v", "no").unwrap();
        }

        assert_eq!(
            draft.add_field("extra", "v", "no"),
            Err(EmbedDraftError::FieldLimit)
        );
        assert_eq!(draft.fields.len(), MAX_FIELDS);
    }

    #[test]
    fn session_is_terminal_after_send() {
        let mut session = EmbedBuilderSession::new(1);
        session.edit().unwrap().set_core("Hi", "There", "");

        let sent = session.send().unwrap();
        assert_eq!(sent.title, "Hi");
        assert_eq!(session.state(), SessionState::Sent);

        assert_eq!(session.cancel(), Err(EmbedDraftError::SessionClosed));
        assert!(session.edit().is_err());
        assert!(session.time_out().is_err());
    }

    #[test]
    fn failed_post_keeps_the_session_open() {
        let mut session = EmbedBuilderSession::new(1);
        session.edit().unwrap().set_core("Hi", "There", "");

        let draft = session.pending_send().unwrap();
        assert_eq!(draft.title, "Hi");
        assert_eq!(session.state(), SessionState::Editing);

        // Still editable and sendable after the post did not go through.
        session.edit().unwrap().set_core("Hi again", "There", "");
        assert_eq!(session.send().unwrap().title, "Hi again");
        assert!(session.pending_send().is_err());
    }

    #[test]
    fn timeout_closes_an_idle_session() {
        let mut session = EmbedBuilderSession::new(1);
        session.time_out().unwrap();

        assert_eq!(session.state(), SessionState::TimedOut);
        assert!(session.send().is_err());
    }
}
