// Normalization and indicator-extraction engine for security logs.

// Core model
pub mod field;
pub mod indicator;
pub mod schema;

// Parsing
pub mod parser;

// Process plumbing
pub mod conf;
pub mod runtime;
