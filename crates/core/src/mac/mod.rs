/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
///
/// # Parameters
///
/// - `$key`: An expression representing the name of the environment variable.
/// - `$t`: The type of the value to be parsed.
/// - `$default`: The default value to fall back to if the environment variable is not set or
///   parsing fails.
///
/// # Return Value
///
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With no default specified
	($key:expr_2021, Option<String>) => {
		std::sync::LazyLock::new(|| std::env::var($key).ok())
	};
	// With no default specified
	($key:expr_2021, $t:ty) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_default()
		})
	};
	// With a closure for the default value
	($key:expr_2021, $t:ty, || $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	// With a static expression for the default value
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Wraps a relational layer call, recording the executed statement
/// in the given query log together with the elapsed time.
///
/// The statement is taken from the selection after the call returns,
/// so that placeholder expansion is reflected in the log entry.
macro_rules! logged {
	($log:expr_2021, $sel:ident, $call:expr_2021) => {{
		let started = std::time::Instant::now();
		let res = $call;
		if let Some(log) = $log {
			match &res {
				Ok(_) => log.record_timed(&$sel.sql(), started.elapsed()),
				Err(_) => log.record_failed(&$sel.sql()),
			}
		}
		res
	}};
}

#[cfg(test)]
mod test {
	use std::sync::LazyLock;

	#[test]
	fn lazy_env_parse_falls_back_to_default() {
		static UNSET: LazyLock<usize> =
			lazy_env_parse!("SQLGRAPH_TEST_VARIABLE_WHICH_IS_NEVER_SET", usize, 17);
		assert_eq!(*UNSET, 17);
	}

	#[test]
	fn lazy_env_parse_without_default() {
		static UNSET: LazyLock<Option<String>> =
			lazy_env_parse!("SQLGRAPH_TEST_VARIABLE_WHICH_IS_NEVER_SET", Option<String>);
		assert_eq!(*UNSET, None);
	}
}
