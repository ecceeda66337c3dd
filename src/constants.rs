//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Source loading constants
pub mod source {
    /// Default size ceiling for a single source file (1MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

    /// Encoding declarations are only honoured on the first two lines
    pub const ENCODING_DECLARATION_LINES: usize = 2;

    /// Encoding label reported for files carrying a UTF-8 byte-order mark
    pub const UTF8_SIG_LABEL: &str = "utf-8-sig";

    /// Encoding label reported for plain and lossy UTF-8 decoding
    pub const UTF8_LABEL: &str = "utf-8";
}

/// Structural extraction constants
pub mod extraction {
    /// Name of the designated initializer
    pub const INITIALIZER_NAME: &str = "__init__";

    /// Receiver name that marks instance attributes (`self.x`)
    pub const SELF_NAME: &str = "self";

    /// Maximum statement nesting the visitor descends before giving up on a file
    pub const MAX_VISIT_DEPTH: usize = 512;

    /// Maximum expression nesting for text reproduction and type-name extraction
    pub const MAX_EXPR_DEPTH: usize = 256;

    /// Largest expression (in tree nodes) rendered as a structural dump
    pub const MAX_DUMP_NODES: usize = 4096;

    /// Emitted when an expression can be neither reproduced nor dumped
    pub const EXPR_PLACEHOLDER: &str = "<expr>";

    /// Builtin type names that never become composition targets
    pub const PRIMITIVE_TYPES: &[&str] = &[
        "int", "str", "float", "bool", "dict", "list", "set", "tuple", "None",
    ];
}

/// Diagram rendering constants
pub mod diagram {
    /// Importance score weight per method
    pub const METHOD_WEIGHT: usize = 2;

    /// Importance score weight per base class
    pub const BASE_WEIGHT: usize = 3;

    /// Importance score weight per composition edge
    pub const COMPOSITION_WEIGHT: usize = 3;

    /// Universal base class, never drawn as an inheritance edge
    pub const UNIVERSAL_BASE: &str = "object";

    /// Default class limit used by the analyze command
    pub const DEFAULT_MAX_CLASSES: usize = 40;
}

/// Tech-stack scoring weights
pub mod tech_stack {
    /// Per detected web framework
    pub const WEB_FRAMEWORK_WEIGHT: f64 = 4.0;
    /// Once, when any web server runtime is present
    pub const WEB_RUNTIME_BONUS: f64 = 2.0;
    /// Per web-adjacent library
    pub const WEB_RELATED_WEIGHT: f64 = 0.5;
    /// Per machine-learning package
    pub const ML_WEIGHT: f64 = 1.5;
    /// Once, when a deep-learning framework is present
    pub const ML_FRAMEWORK_BONUS: f64 = 2.0;
    /// Per scientific package
    pub const SCIENTIFIC_WEIGHT: f64 = 1.0;
    /// Once, when numpy or scipy is present
    pub const SCIENTIFIC_CORE_BONUS: f64 = 1.0;
    /// Per CLI toolkit package
    pub const CLI_WEIGHT: f64 = 1.2;
    /// Once, when the build manifest declares console scripts
    pub const CLI_SCRIPTS_BONUS: f64 = 4.0;
    /// Confidence gained per point of margin over the runner-up
    pub const CONFIDENCE_PER_MARGIN: f64 = 0.25;
}
