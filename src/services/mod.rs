//! Services composing the reasoning core with storage, generation and audit.

mod audit;
mod generation;
mod graph;

pub use audit::{
    Actor, AuditEvent, AuditEventKind, AuditFilter, AuditLog, AuditRecord, AuditSink,
    FileAuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use generation::{
    generator_for, ExtractiveGenerator, Generation, GenerationRequest, TextGenerator,
    INSUFFICIENT_CONTEXT,
};
pub use graph::{Answer, Document, GraphService, GraphUpdate, IngestReport, UpdateReport};
