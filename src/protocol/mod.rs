pub mod canonical;
pub mod mapping;
pub mod openai_chat;
