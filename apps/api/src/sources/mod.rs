// Source ingestion: text extraction from uploads, chunking, and LLM summaries of the chunks.

pub mod chunking;
pub mod extract;
pub mod prompts;
pub mod summarizer;
