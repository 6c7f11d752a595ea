//! Compiler configuration (spec 9 Open Question: configurable buffer/arena sizes)
//!
//! Builder-pattern config, modeled on the teacher's `CompilerConfig`/
//! `ExternalBuiltin` extensibility layer, narrowed to what this
//! pipeline actually needs: arena/buffer sizing and the line-directive
//! toggle named in spec.md's Open Questions.

use crate::arena::{DEFAULT_ARENA_BYTES, DEFAULT_SOURCE_BUFFER_BYTES};

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub arena_bytes: usize,
    pub source_buffer_bytes: usize,
    pub line_directives: bool,
    pub keep_c: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            arena_bytes: DEFAULT_ARENA_BYTES,
            source_buffer_bytes: DEFAULT_SOURCE_BUFFER_BYTES,
            line_directives: false,
            keep_c: false,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_arena_bytes(mut self, bytes: usize) -> Self {
        self.arena_bytes = bytes;
        self
    }

    pub fn with_source_buffer_bytes(mut self, bytes: usize) -> Self {
        self.source_buffer_bytes = bytes;
        self
    }

    pub fn with_line_directives(mut self, enabled: bool) -> Self {
        self.line_directives = enabled;
        self
    }

    pub fn with_keep_c(mut self, enabled: bool) -> Self {
        self.keep_c = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_sizes() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.arena_bytes, DEFAULT_ARENA_BYTES);
        assert_eq!(cfg.source_buffer_bytes, DEFAULT_SOURCE_BUFFER_BYTES);
        assert!(!cfg.line_directives);
    }

    #[test]
    fn builder_overrides_each_field() {
        let cfg = CompilerConfig::new().with_arena_bytes(4096).with_line_directives(true).with_keep_c(true);
        assert_eq!(cfg.arena_bytes, 4096);
        assert!(cfg.line_directives);
        assert!(cfg.keep_c);
    }
}
