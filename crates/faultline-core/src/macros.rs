//! Assertion macros for test bodies.
//!
//! Every macro takes the body's `&TestContext` first and returns early from
//! the enclosing body on failure.

/// Source location of the macro call site.
#[macro_export]
macro_rules! here {
    () => {
        $crate::Location::new(::core::file!(), ::core::line!())
    };
}

/// End the test as passed.
#[macro_export]
macro_rules! pass {
    () => {
        return ::core::result::Result::Ok(())
    };
}

/// End the test with an explicit failure.
#[macro_export]
macro_rules! fail {
    ($ctx:expr $(,)?) => {
        return ::core::result::Result::Err($ctx.explicit_failure($crate::here!()))
    };
}

/// Fail the test if `cond` is false.
///
/// ```ignore
/// check!(ctx, a + b == 15);
/// ```
#[macro_export]
macro_rules! check {
    ($ctx:expr, $cond:expr $(,)?) => {
        if !($cond) {
            return ::core::result::Result::Err($ctx.assertion_failed(
                ::core::stringify!($cond),
                $crate::here!(),
                ::core::option::Option::None,
                ::core::option::Option::None::<fn()>,
            ));
        }
    };
}

/// Like [`check!`], also logging a formatted message on failure.
#[macro_export]
macro_rules! check_log {
    ($ctx:expr, $cond:expr, $($arg:tt)+) => {
        if !($cond) {
            return ::core::result::Result::Err($ctx.assertion_failed(
                ::core::stringify!($cond),
                $crate::here!(),
                ::core::option::Option::Some(::std::format!($($arg)+)),
                ::core::option::Option::None::<fn()>,
            ));
        }
    };
}

/// Like [`check!`], running `cleanup` (a closure) once if the check fails.
///
/// The closure is only built on the failing path, so it may move values the
/// rest of the body still uses:
///
/// ```ignore
/// check_clean!(ctx, v.len() == 1, || drop(v));
/// ```
#[macro_export]
macro_rules! check_clean {
    ($ctx:expr, $cond:expr, $cleanup:expr $(,)?) => {
        if !($cond) {
            return ::core::result::Result::Err($ctx.assertion_failed(
                ::core::stringify!($cond),
                $crate::here!(),
                ::core::option::Option::None,
                ::core::option::Option::Some($cleanup),
            ));
        }
    };
}

/// [`check_clean!`] plus a formatted failure message.
#[macro_export]
macro_rules! check_clean_log {
    ($ctx:expr, $cond:expr, $cleanup:expr, $($arg:tt)+) => {
        if !($cond) {
            return ::core::result::Result::Err($ctx.assertion_failed(
                ::core::stringify!($cond),
                $crate::here!(),
                ::core::option::Option::Some(::std::format!($($arg)+)),
                ::core::option::Option::Some($cleanup),
            ));
        }
    };
}
