//! Integration test crate for blocktrack.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the tracking engine through fake hosts built on
//! blocktrack-core images.


#[cfg(test)]
mod matching;

#[cfg(test)]
mod session;
