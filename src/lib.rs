pub mod api;
pub mod batch;
pub mod config;
pub mod corpus;
pub mod crack;
pub mod digest;
pub mod entropy;
pub mod error;
pub mod export;
pub mod io;
pub mod kdf;
pub mod rainbow;
pub mod report;
pub mod salting;
pub mod session;

pub mod prelude {
    pub use crate::config::SimConfig;
    pub use crate::crack::{CrackEstimate, CrackTime, CrackTimeProjector};
    pub use crate::digest::{Digest, DigestOracle, Salt, Sha256Oracle};
    pub use crate::error::SimError;
    pub use crate::kdf::{KdfHarness, KdfKind, KdfParams};
    pub use crate::salting::SaltingEngine;
    pub use crate::session::Session;
}
