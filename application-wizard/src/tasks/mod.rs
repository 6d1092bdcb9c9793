// Application wizard tasks, one per step
pub mod select_type;
pub mod enter_details;
pub mod upload_documents;
pub mod submit_application;

// Shared modules
pub mod types;
pub mod utils;

pub use select_type::SelectTypeTask;
pub use enter_details::EnterDetailsTask;
pub use upload_documents::UploadDocumentsTask;
pub use submit_application::SubmitApplicationTask;

pub use types::session_keys;
