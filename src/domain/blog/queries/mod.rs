//! Statement builders for the blog tables

pub mod articles;
mod keyset;
pub mod tags;
