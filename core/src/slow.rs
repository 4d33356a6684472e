//! Run-time safety checks that can be compiled out with `"no-slow-safety-checks"`.

/// `assert!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(not(feature = "no-slow-safety-checks"))]
#[macro_export]
macro_rules! forge_slow_assert {
    ($($arg:tt)*) => {
        assert!($($arg)*);
    }
}

/// `assert_eq!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(not(feature = "no-slow-safety-checks"))]
#[macro_export]
macro_rules! forge_slow_assert_eq {
    ($($arg:tt)*) => {
        assert_eq!($($arg)*);
    }
}

/// `assert!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(feature = "no-slow-safety-checks")]
#[macro_export]
macro_rules! forge_slow_assert {
    ($($arg:tt)*) => {};
}

/// `assert_eq!` that exists only if `"no-slow-safety-checks"` feature is not enabled.
#[cfg(feature = "no-slow-safety-checks")]
#[macro_export]
macro_rules! forge_slow_assert_eq {
    ($($arg:tt)*) => {};
}
