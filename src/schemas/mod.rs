//! Provider wire schemas

pub mod gemini;
