//! Helper macros for port entry points.
//!
//! Provides `port_operations!`, which generates both entry forms of each
//! port operation from a single signature:
//!
//! ```ignore
//! port_operations! {
//!     /// Doc comment for both forms.
//!     fn get_byte(&mut self) -> Option<u8>;
//! }
//! ```
//!
//! expands to an acquiring `Port::get_byte(&self)` that locks the port for
//! the duration of the call, and a non-acquiring `PortGuard::get_byte(&self)`
//! for callers that already hold the lock. Both forward to
//! `PortState::get_byte`.
macro_rules! port_operations {
    (
        $(
            $(#[$meta:meta])*
            fn $name:ident(&mut self $(, $arg:ident : $argty:ty)* $(,)?) -> $ret:ty;
        )*
    ) => {
        impl $crate::port::Port {
            $(
                $(#[$meta])*
                pub fn $name(&self $(, $arg: $argty)*) -> $crate::error::Result<$ret> {
                    self.lock().$name($($arg),*)
                }
            )*
        }

        impl $crate::port::PortGuard<'_> {
            $(
                $(#[$meta])*
                pub fn $name(&self $(, $arg: $argty)*) -> $crate::error::Result<$ret> {
                    self.state()?.$name($($arg),*)
                }
            )*
        }
    };
}

pub(crate) use port_operations;
