// core.rs splits the ledger into chain management, canonical encoding and
// validation.
pub mod canonical;
pub mod chain;
pub mod validation;

pub use canonical::*;
pub use chain::*;
pub use validation::*;
