//! Process exit codes
//!
//! Follows Unix conventions: 0 for success, small positive codes per failure class.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure, including failed lint runs
pub const ERROR: i32 = 1;

/// Validation error - values do not match values.schema.json or --set is malformed
pub const VALIDATION_ERROR: i32 = 2;

/// Render error - missing required value, invalid value, incompatible cluster
pub const RENDER_ERROR: i32 = 3;

/// Chart error - missing or invalid Chart.yaml, unreadable values.yaml
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
