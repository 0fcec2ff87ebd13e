// Domain-layer modules and shared errors/models
pub mod scoring {
    pub use crate::scoring::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod intake {
    pub use crate::intake::*;
}

pub mod errors {
    pub use crate::errors::*;
}
