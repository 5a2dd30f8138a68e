//! Theme configuration: merge, presentation structure and the runtime
//! config lifecycle.

pub mod compilation;
pub mod error;
pub mod graph;
pub mod merge;
pub mod runtime;
pub mod structure;

pub use compilation::{CompilationError, ScriptFileResolver};
pub use error::ThemeConfigError;
pub use merge::{ConfigMerger, MergedConfig};
pub use runtime::{Clock, RuntimeConfigService, SystemClock};
pub use structure::{ThemeStructure, build_structure};
