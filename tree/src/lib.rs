//! brine-nifxml-tree
//!
//! The document tree consumed by the compiler:
//!  1) `Element`, an owned element node with string attributes, ordered element
//!     children and an optional leading text node,
//!  2) `read_document`, which turns XML text into an `Element` tree,
//!  3) `TreeError`.

pub mod element;
pub mod error;
pub mod reader;

pub use element::Element;
pub use error::TreeError;
pub use reader::read_document;
