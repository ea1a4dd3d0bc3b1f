pub mod audit;
pub mod config;
pub mod knowledge;

pub use audit::AuditRecord;
pub use config::{
    AppConfig, ConfigError, ConfigOverrides, HecConfig, KnowledgeConfig, LoadOptions, LogFormat,
    LoggingConfig, ServerConfig, WebexConfig,
};
pub use knowledge::{
    hit_reply, miss_reply, normalize_keyword, FileKnowledgeStore, InMemoryKnowledgeStore,
    KnowledgeError, KnowledgeStore,
};
