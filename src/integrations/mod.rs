//! External service integrations.

pub mod llm {
    pub use crate::llm::*;
}

pub mod notify {
    pub use crate::notify::*;
}
