pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
/// Bad arguments, selection keys, ranges or config
pub const INPUT_ERROR: i32 = 2;
/// Strict scan found rejected files, or a checked path is invalid
pub const DIRTY_DATASET: i32 = 3;
