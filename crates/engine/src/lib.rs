mod changeset;
mod context;
mod disposition;
mod driver;
mod error;
mod manager;
mod options;
mod wellknown;

pub use changeset::ChangeSet;
pub use context::{ContextId, ContextInfo, ContextTree, Descendants};
pub use disposition::{FolderDisposition, PackageMap, PackagesParseError, parse_packages_file};
pub use driver::{
    AnalysisDriver, AnalysisError, ContextRoot, DriverProvider, FileValidator, NotificationSink,
    Severity, SourceId, ValidatorError,
};
pub use error::ManagerError;
pub use manager::{ContextManager, ContextSummary, ManagerConfig};
pub use options::{AnalysisOptions, locate_options_file, parse_options, read_options};
pub use wellknown::{
    DescriptorKind, descriptor_kind, in_dot_folder, in_top_level_doc, is_android_manifest,
    is_fix_data_file, is_options_file,
};
