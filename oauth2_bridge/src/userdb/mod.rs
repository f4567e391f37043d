//! Maps provider identities onto local user accounts.

mod errors;
mod memory;
mod storage;
mod types;

pub use errors::UserError;
pub use memory::MemoryIdentityMapper;
pub use storage::SqlxIdentityMapper;
pub use types::{IdentityMapper, LocalUser};
