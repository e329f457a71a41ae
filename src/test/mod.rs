//! Shared fixtures for unit tests.


pub(crate) use factories::*;
