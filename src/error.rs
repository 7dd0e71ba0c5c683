use floem_observable::WriteError;

use crate::{config::BindingMode, parser::ParseError};

/// Failures surfaced by a [`PathWalker`](crate::PathWalker) or a
/// [`BindingExpression`](crate::BindingExpression).
///
/// A broken path is not one of them: broken links only show up through
/// `is_path_broken`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkerError {
    /// The path expression is malformed; no walker was built.
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("cannot write through `{path}`: the path is broken")]
    PathBroken { path: String },
    #[error("cannot write through `{path}`: the path ends at the binding source")]
    SourceNotWritable { path: String },
    #[error("binding mode {mode} does not write back to the source")]
    ReadOnlyMode { mode: BindingMode },
    #[error("the walker for `{path}` has been detached")]
    Detached { path: String },
    #[error(transparent)]
    Write(#[from] WriteError),
}
