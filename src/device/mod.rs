//! Device handle trait and state-machine implementations.
//!
//! CCD and monochromator vocabularies are disjoint, so devices are not
//! modelled as one enum; instead they share the capability set below
//! (open/close/is_open) as a trait, per the "polymorphism across devices"
//! design note.

pub mod ccd;
pub mod config;
pub mod mono;

use crate::error::Result;

/// Capabilities common to every device handle, regardless of class.
pub trait Device {
    /// The ICL-assigned device index, stable for the session.
    fn index(&self) -> u32;

    /// Sends `<class>_open {index}`.
    fn open(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Sends `<class>_close {index}`.
    fn close(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Queries live device-side open state via `<class>_isOpen`. Not a
    /// local cache.
    fn is_open(&self) -> impl std::future::Future<Output = Result<bool>> + Send;
}
