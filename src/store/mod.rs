pub mod alternate;
pub mod loose;

pub use alternate::{AlternateStoreRegistry, RemoteUrlResolver, WriteOutcome};
pub use loose::{LooseObjectStore, StoreOptions};
