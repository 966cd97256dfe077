//! Identity strategies.
//!
//! | strategy | priority | confidence |
//! |----------|----------|------------|
//! | [`ClickedElementStrategy`] | 1 | 0.9 |
//! | [`UrlBasedStrategy`] | 2 | 0.8 |
//! | [`DomStructureStrategy`] | 3 | 0.6 |
//! | [`DataAttributeStrategy`] | 4 | 0.5 |
//! | [`ParentTraversalStrategy`] | 5 | 0.25 |

pub mod author;
mod strategies;

pub use author::{CONTAINER_SELECTOR, UNKNOWN_AUTHOR, is_valid_username, resolve_author};
pub use strategies::{
    ClickedElementStrategy, DataAttributeStrategy, DomStructureStrategy, ParentTraversalStrategy,
    UrlBasedStrategy,
};
