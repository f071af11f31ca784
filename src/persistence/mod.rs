pub mod writer;

pub use writer::{derive_filename, write, CollisionPolicy, PersistenceWriter};
