//! Module map installed into every slice of the libgit2 bundle.
//!
//! Lets Clang-based consumers import the C API as the `Clibgit2` module.
//! The umbrella header covers the public API; headers that are not reachable
//! from it get explicit submodules.

pub const LIBGIT2_MODULE_MAP: &str = r#"module Clibgit2 {
	umbrella header "git2.h"

	export *
	module * { export * }

	// Exclude headers intended only for Microsoft compilers
	exclude header "git2/inttypes.h"
	exclude header "git2/stdint.h"

	// Explicit modules for headers not included in the umbrella header:
	explicit module cred_helpers {
		header "git2/cred_helpers.h"

		export *
	}

	explicit module trace {
		header "git2/trace.h"

		export *
	}

	// Explicit module for the "sys" headers:
	explicit module sys {
		umbrella "git2/sys"

		export *
		module * { export * }
	}

	link "curl"
	link "iconv"
	link "z"
}
"#;

/// Location of the module map inside one bundle slice.
pub const MODULE_MAP_RELATIVE_PATH: [&str; 2] = ["Headers", "module.modulemap"];
