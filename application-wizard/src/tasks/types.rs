// Context keys shared by the wizard tasks and the service
pub mod session_keys {
    /// The pending `WizardEvent`, consumed by whichever task runs next
    pub const EVENT: &str = "wizard_event";
    pub const SESSION_ID: &str = "session_id";
    pub const DRAFT: &str = "draft";
    pub const STEP: &str = "step";
    /// Inline message shown to the user; a new one replaces the old
    pub const MESSAGE: &str = "message";
    pub const LAST_SUBMISSION: &str = "last_submission";
    pub const CELEBRATION: &str = "celebration";
    pub const WALLET: &str = "wallet";
}
