//! Text renderings of the front end's output: the structural trace of a
//! parsed class and the raw token listing.

pub mod structure;
pub mod token_dumper;

pub use structure::StructureWriter;
pub use token_dumper::TokenDumper;
