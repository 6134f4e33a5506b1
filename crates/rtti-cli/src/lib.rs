//! `rtti-check`: validate JSON documents against a descriptor module.
//!
//! - `args`: command-line surface (clap derive)
//! - `driver`: loads the module, binds type arguments and matches every value

pub mod args;
pub mod driver;
