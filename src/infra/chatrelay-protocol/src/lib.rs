mod chat;
mod contact;
mod error;
mod history;
mod tools;

pub use chat::{ChatRequest, ChatResponse, ErrorBody};
pub use contact::{is_valid_email, ContactArgs};
pub use error::ProtocolError;
pub use history::{HistoryEntry, HistoryQuery, HistoryResponse, Role};
pub use tools::{ToolRequest, ToolResponse, ToolStatus, CREATE_CONTACT};
