//! Qualify Chat: scripted qualification questionnaire engine.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod http;
pub mod submit;
