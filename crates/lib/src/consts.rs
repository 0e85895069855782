pub const APP_NAME: &str = "buildgit2";

/// Default work root name, created in the invocation directory.
pub const WORK_DIR_NAME: &str = "build_libgit2_work";

/// Default bundle output directory name, created in the invocation directory.
pub const OUTPUT_DIR_NAME: &str = "build_libgit2_output";

pub const WORK_DIR_ENV: &str = "BUILDGIT2_WORK_DIR";
pub const OUTPUT_DIR_ENV: &str = "BUILDGIT2_OUTPUT_DIR";
pub const JOBS_ENV: &str = "BUILDGIT2_JOBS";

/// Directory the tool was invoked from, as exported by some shells and wrappers.
pub const INVOCATION_DIR_ENV: &str = "OPWD";
