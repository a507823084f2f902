pub mod config;
pub mod converter;
pub mod format;
pub mod locator;
pub mod metrics;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ExecutionConfig,
    ToolsConfig,
};
pub use converter::{
    ConversionError, ConversionOptions, ConversionRequest, ConversionStrategy, ErrorKind,
    GhostscriptStrategy, InkscapeStrategy, StrategyRegistry,
};
pub use format::{Document, Format};
pub use locator::{LocatorError, ToolLocator, ToolSpec};
pub use pipeline::{BoundingBox, Converter};
pub use platform::{Platform, SystemPlatform};
pub use process::{CommandExecutor, CommandSpec, ExecutionError, ProcessError, ProcessRunner};
