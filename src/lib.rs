//! Folder navigation tree for notebooks of plain directories.
//!
//! [`notebook::Library`] is the on-disk folder model. [`tree::TreeSyncEngine`]
//! keeps a lazily built tree of rows in step with it, and the clipboard and
//! quick-navigation controllers in [`tree`] operate on that engine.

pub mod config;
pub mod error;
pub mod notebook;
pub mod tree;
