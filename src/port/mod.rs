//! Trait seams between the pipeline core and its external collaborators.

pub mod broker;
pub mod channel;
pub mod directory;
pub mod llm;
pub mod validator;

pub use broker::{Broker, EntryId, StreamEntry};
pub use channel::{ChannelSendResult, NotificationChannel};
pub use directory::SubscriberDirectory;
pub use llm::{ChatCompletion, ChatMessage, Completion, CompletionRequest, TokenUsage};
pub use validator::GlitchValidator;
