//! Concrete [`Site`](crate::Site) implementations.

pub mod careers360;

pub use careers360::Careers360;
