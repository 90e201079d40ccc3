// Market data module entrypoint
pub mod adapters;       // per-venue snapshot parsers (Coinbase, Gemini, Kraken)
pub mod normaliser;     // wire strings/numbers -> Decimal levels
pub mod composite_book; // all venues merged into one ordered book
pub mod fetch;          // HTTP snapshot retrieval
pub mod router;         // orchestrates one query end to end
