/// Checks that a numerical value is in the provided interval `[a,b]`, returning
/// [`AgentError::OutOfInterval`](crate::error::AgentError::OutOfInterval) from the
/// enclosing function if not
///
/// ### Example
/// ```ignore
/// let gamma = 2.0;
/// ensure_interval!(gamma, 0.0, 1.0);
/// ```
/// This returns an error with the message "Invalid value for \`gamma\`: 2. Must be in the interval \[0, 1\]."
/// A leading `self.` is dropped from the reported name, so `self.gamma` is also reported as \`gamma\`.
#[macro_export]
macro_rules! ensure_interval {
    ($var:expr, $a:expr, $b:expr) => {
        if !($var >= $a && $var <= $b) {
            return Err($crate::error::AgentError::OutOfInterval {
                name: $crate::util::field_name(stringify!($var)),
                value: f64::from($var),
                min: $a,
                max: $b,
            });
        }
    };
}

/// Checks that a numerical value is strictly positive, returning
/// [`AgentError::NotPositive`](crate::error::AgentError::NotPositive) from the
/// enclosing function if not
#[macro_export]
macro_rules! ensure_positive {
    ($var:expr) => {
        if !(f64::from($var) > 0.0) {
            return Err($crate::error::AgentError::NotPositive {
                name: $crate::util::field_name(stringify!($var)),
                value: f64::from($var),
            });
        }
    };
}

#[doc(hidden)]
pub fn field_name(expr: &'static str) -> &'static str {
    expr.trim_start_matches("self.")
}
