/// Runtime limits for an execution.
///
/// # Example
///
/// ```
/// use ingot_core::interpreter::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_depth: 500,
///     max_iterations: Some(10_000),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum nesting of function invocations.
    ///
    /// Default: 1000
    pub max_depth: usize,

    /// Maximum number of iterations of a single loop, if any.
    ///
    /// Default: None
    pub max_iterations: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: None,
        }
    }
}
