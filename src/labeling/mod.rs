//! Automatic labeling through a batch chat-completion API.
//!
//! Outbound: [`BatchRequestFactory`] turns a bank into a JSONL batch file.
//! Inbound: [`ResponseParsingPipeline`] reads the provider's result file,
//! pulls the tagged JSON block out of each reply and sets tags and keywords on
//! the matching questions.

pub mod error;
pub mod labels;
pub mod pipeline;
pub mod request;
pub mod response;

pub use error::LabelError;
pub use labels::{LabelData, LabelFactory, MessageFormat};
pub use pipeline::ResponseParsingPipeline;
pub use request::{BatchRequest, BatchRequestFactory, LabelingRequest, RequestFactory};
pub use response::BatchResponse;
