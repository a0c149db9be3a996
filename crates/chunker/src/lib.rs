//! # Librarian Chunker
//!
//! Structural code chunking for semantic indexing.
//!
//! ## Philosophy
//!
//! The chunker splits source files into retrieval-sized fragments without a
//! full grammar: a single forward scan with a brace-depth counter finds
//! namespace, type, and member boundaries, and everything that resists that
//! scan degrades to fixed-size windowing with overlap. Each fragment carries
//! a context header (`namespace X > class Foo > method Bar`) so the
//! embedding text stays meaningful outside the file.
//!
//! ## Architecture
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Registry Dispatch (extension → LanguageChunker)
//!     │
//!     ├──> Structure Scan
//!     │    ├─> namespace / type / member boundaries
//!     │    ├─> member ends via brace counting
//!     │    └─> architecture-signal flagging
//!     │
//!     └──> Chunk Emission
//!          ├─> one chunk per member + file header
//!          ├─> fallback windowing with overlap
//!          └─> ChunkUnit[] with stable ids
//! ```
//!
//! ## Example
//!
//! ```rust
//! use librarian_chunker::{ChunkerConfig, ChunkerRegistry};
//!
//! let registry = ChunkerRegistry::with_defaults(ChunkerConfig::default());
//! let code = "namespace App\n{\n    public class Greeter\n    {\n        public string Hello(string name)\n        {\n            return $\"Hello {name}\";\n        }\n    }\n}\n";
//!
//! if let Some(chunker) = registry.chunker_for("src/Greeter.cs") {
//!     let chunks = chunker.chunk_file("src/Greeter.cs", code);
//!     for chunk in chunks {
//!         println!("{}: lines {}-{}", chunk.context_header, chunk.start_line, chunk.end_line);
//!     }
//! }
//! ```

mod config;
mod csharp;
mod emit;
mod error;
mod registry;
mod rust;
mod types;

pub use config::ChunkerConfig;
pub use csharp::CSharpChunker;
pub use error::{ChunkerError, Result};
pub use registry::{ChunkerRegistry, LanguageChunker};
pub use rust::RustChunker;
pub use types::{chunk_id, ChunkKind, ChunkUnit};
