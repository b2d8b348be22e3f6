/// Interpreter limits and reporting switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Deepest nesting of script calls before "Stack overflow.".
    pub max_call_depth: usize,

    /// Whether the front end prints resolver warnings.  They are collected
    /// either way.
    pub warnings: bool,
}

impl Config {
    /// Host stack for the thread that runs a session.
    pub const STACK_SIZE: usize = 256 * 1024 * 1024;

    /// Host stack reserved for one script call, including the expression
    /// and statement frames evaluated inside it.
    pub const STACK_PER_CALL: usize = 64 * 1024;

    /// Calls that fit in [`Config::STACK_SIZE`], so the guard fires before
    /// the host stack runs out.
    pub const DEFAULT_MAX_CALL_DEPTH: usize = Self::STACK_SIZE / Self::STACK_PER_CALL;
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            warnings: true,
        }
    }
}
