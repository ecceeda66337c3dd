//! Python Parser Module
//!
//! Tree-sitter based structural extraction for Python sources.
//!
//! ```rust,ignore
//! use pyarch::analyzer::parser::{Extractor, PythonExtractor};
//!
//! let module = PythonExtractor::new().extract_file(Path::new("app/models.py"));
//! for class in &module.classes {
//!     println!("{} {:?}", class.name, class.bases);
//! }
//! ```

pub mod expr;
pub mod python;
pub mod traits;

pub use expr::{canonical_text, expression_text, type_names, type_names_from_str};
pub use python::PythonExtractor;
pub use traits::{
    Extractor, create_ts_parser, find_syntax_error, get_node_position, get_node_text, node_line,
    parse_python,
};
