/// Data layer: table model, delimited-text I/O, and filtering.
///
/// Architecture:
/// ```text
///      .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  dedupe, range tests, date normalisation
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Table → .csv
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
