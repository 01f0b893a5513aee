use std::collections::HashMap;

/// Everything configured for one guild: setting name -> channel or role id.
/// A missing entry means "not configured", never an error.
pub type GuildSettings = HashMap<String, u64>;

/// The setting names the bot itself reads.
///
/// The store accepts any string key; these are just the ones with meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    WelcomeChannel,
    GoodbyeChannel,
    AutoRole,
    VerificationRole,
    TicketCategory,
    TicketStaffRole,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::WelcomeChannel,
        SettingKey::GoodbyeChannel,
        SettingKey::AutoRole,
        SettingKey::VerificationRole,
        SettingKey::TicketCategory,
        SettingKey::TicketStaffRole,
    ];

    /// Name used in the persisted file.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::WelcomeChannel => "welcome_channel_id",
            SettingKey::GoodbyeChannel => "goodbye_channel_id",
            SettingKey::AutoRole => "auto_role_id",
            SettingKey::VerificationRole => "verification_role_id",
            SettingKey::TicketCategory => "ticket_category_id",
            SettingKey::TicketStaffRole => "ticket_staff_role_id",
        }
    }

    /// Human label for `/config show`.
    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::WelcomeChannel => "Welcome channel",
            SettingKey::GoodbyeChannel => "Goodbye channel",
            SettingKey::AutoRole => "Auto role",
            SettingKey::VerificationRole => "Verification role",
            SettingKey::TicketCategory => "Ticket category",
            SettingKey::TicketStaffRole => "Ticket staff role",
        }
    }

    /// Whether the stored id points at a role (otherwise a channel).
    pub fn is_role(&self) -> bool {
        matches!(
            self,
            SettingKey::AutoRole | SettingKey::VerificationRole | SettingKey::TicketStaffRole
        )
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
