//! Smart Mapper: statically-routed AI extraction over two independently
//! configured LLM providers.

pub mod mapper;
pub mod prompts;
pub mod provider;
pub mod provider_a;
pub mod provider_b;
pub mod template;

pub use mapper::SmartMapper;
pub use provider::{LlmProvider, MapperError};
pub use provider_a::ProviderA;
pub use provider_b::ProviderB;
pub use template::builtin_template;
