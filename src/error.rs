use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the failure modes of control flow graph construction and data flow
/// analysis execution. Each variant provides specific context about the failure mode to
/// enable appropriate error handling.
///
/// # Error Categories
///
/// ## Graph Construction Errors
/// - [`Error::GraphError`] - Invalid control flow graph structure
/// - [`Error::Empty`] - Empty block list provided
///
/// ## Analysis Errors
/// - [`Error::Cancelled`] - Cooperative cancellation was requested mid-analysis
///
/// # Examples
///
/// ```rust
/// use flowscope::{Error, prelude::*};
///
/// let builder: ControlFlowGraphBuilder<Operation> = ControlFlowGraphBuilder::new();
/// match builder.build() {
///     Ok(_) => println!("Graph built"),
///     Err(Error::Empty) => eprintln!("No blocks were added"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The analysis was cancelled before reaching a fixpoint.
    ///
    /// Cancellation is cooperative and checked between block visits. A cancelled run
    /// publishes no partial results; callers must treat this as "no result", never
    /// as a stale or incomplete one.
    #[error("Analysis was cancelled before reaching a fixpoint")]
    Cancelled,

    /// The control flow graph is structurally invalid.
    ///
    /// This error occurs during graph construction when an edge references a block
    /// that was never added, or when the graph violates a structural invariant the
    /// analysis engine relies on.
    #[error("{0}")]
    GraphError(String),

    /// Provided block list was empty.
    ///
    /// A control flow graph needs at least an entry block. This error occurs when
    /// [`build`](crate::cfg::ControlFlowGraphBuilder::build) is called before any
    /// block was added.
    #[error("Provided block list was empty")]
    Empty,
}
