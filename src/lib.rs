//! A library for scraping paginated college listings and their rendered detail pages.

pub mod client;
pub mod error;
pub mod persist;
pub mod pipeline;
pub mod record;
pub mod render;
mod site;
pub mod sites;

pub use client::{HttpClient, LimitedClient, PermitPool, RequestOptions, Response};
pub use error::{HttpError, PersistError, RenderError, SetupError};
pub use persist::{CsvSink, Format, JsonSink, OutputPaths, Sink};
pub use pipeline::{PageRange, Phase, Pipeline, PipelineOptions, RunReport, Sinks};
pub use record::{Fields, Record, RecordCollection, NOT_AVAILABLE};
pub use render::{Renderer, RendererFactory};
pub use site::Site;
