//! TEI document segmentation.
//!
//! [`TeiImporter`] turns one document into an [`ImportedWork`]: a forest of
//! divisions, their verses, and the anomalies repaired on the way.
//!
//! Steps:
//! 1. read the header ([`header`]) and the active State Set ([`states`])
//! 2. walk `<body>` and build the division tree ([`segmenter`])
//! 3. replay each division's markup to cut verses ([`verses`])

pub mod accumulator;
pub mod encoding;
pub mod errors;
pub mod header;
pub mod import_context;
pub mod importer;
pub mod line_number;
pub mod markup;
pub mod normalize;
pub mod segmenter;
pub mod states;
pub mod types;
pub mod verses;

pub use errors::{AccumulationError, AnomalyKind, ConfigurationError, ImportError, MarkupError, StructuralAnomaly};
pub use importer::{declared_state_sets, find_markup_files, TeiImporter};
pub use normalize::{IdentityNormalizer, TextNormalizer};
pub use states::{State, StateSet};
pub use types::{Division, ImportedWork, Verse, WorkInfo};
