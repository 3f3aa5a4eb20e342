//! Integration test suite modules

mod content;
mod feed;
mod layout;
mod social;
