//! Crate-internal logging macros.
//!
//! `error!`, `warn!`, `info!`, `debug!` and `trace!` take `tracing` syntax (fields first, then the
//! message) and emit under the `chain_publisher` target, so embedders can tune the publisher on its
//! own with `RUST_LOG=chain_publisher=debug`. Without the `tracing` feature they expand to a
//! by-reference use of every field and emit nothing.

#[cfg(feature = "tracing")]
macro_rules! publisher_event {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!(target: "chain_publisher", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! publisher_event {
    ($level:ident, $($arg:tt)*) => {
        $crate::__discard_event_fields!($($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { publisher_event!(error, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { publisher_event!(warn, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { publisher_event!(info, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { publisher_event!(debug, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { publisher_event!(trace, $($arg)*) };
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! __discard_event_fields {
    ($field:ident = % $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__discard_event_fields!($($rest)*);
    }};
    ($field:ident = ? $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__discard_event_fields!($($rest)*);
    }};
    ($field:ident = $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__discard_event_fields!($($rest)*);
    }};
    ($message:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
    () => {};
}
